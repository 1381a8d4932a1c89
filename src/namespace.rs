//! Catalog of the namespace prefixes known to the migration
//!
//! Each prefix maps to the URI a JSF 2 template is expected to declare for
//! it. Documents frequently carry stale declarations (Ajax4jsf URIs, old
//! JSTL locations), so the catalog is the reference the matcher compares
//! against and the URI the transform engine rebinds to.

/// A known prefix and the URI it should be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownNamespace {
    pub prefix: &'static str,
    pub uri: &'static str,
}

const KNOWN_NAMESPACES: &[KnownNamespace] = &[
    KnownNamespace { prefix: "c", uri: "http://java.sun.com/jstl/core" },
    KnownNamespace { prefix: "h", uri: "http://java.sun.com/jsf/html" },
    KnownNamespace { prefix: "f", uri: "http://java.sun.com/jsf/core" },
    KnownNamespace { prefix: "ui", uri: "http://java.sun.com/jsf/facelets" },
    KnownNamespace { prefix: "fn", uri: "http://java.sun.com/jsp/jstl/functions" },
    KnownNamespace { prefix: "a4j", uri: "http://richfaces.org/a4j" },
    KnownNamespace { prefix: "rich", uri: "http://richfaces.org/rich" },
    KnownNamespace { prefix: "a4f", uri: "https://ajax4jsf.dev.java.net/ajax" },
    KnownNamespace { prefix: "nxl", uri: "http://nuxeo.org/nxforms/layout" },
    KnownNamespace { prefix: "nxthemes", uri: "http://nuxeo.org/nxthemes" },
    KnownNamespace { prefix: "nxu", uri: "http://nuxeo.org/nxweb/util" },
    KnownNamespace { prefix: "nxh", uri: "http://nuxeo.org/nxweb/html" },
    KnownNamespace { prefix: "nxdir", uri: "http://nuxeo.org/nxdirectory" },
    KnownNamespace { prefix: "nxd", uri: "http://nuxeo.org/nxweb/document" },
    KnownNamespace { prefix: "nxp", uri: "http://nuxeo.org/nxweb/pdf" },
    KnownNamespace { prefix: "nxa4j", uri: "http://nuxeo.org/nxweb/a4j" },
];

/// Read-only prefix -> URI lookup table
#[derive(Debug, Clone, Copy)]
pub struct NamespaceCatalog {
    entries: &'static [KnownNamespace],
}

impl Default for NamespaceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl NamespaceCatalog {
    /// The catalog shipped with the tool
    pub fn builtin() -> Self {
        Self {
            entries: KNOWN_NAMESPACES,
        }
    }

    /// Expected URI for a prefix, `None` when the prefix is unknown
    pub fn resolve(&self, prefix: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|ns| ns.prefix == prefix)
            .map(|ns| ns.uri)
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.resolve(prefix).is_some()
    }

    /// All known namespaces, in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &KnownNamespace> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
