//! Well-known RDF vocabulary terms and namespace handling.

use std::sync::LazyLock;

use regex::Regex;

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const OWL_NS: &str = "http://www.w3.org/2002/07/owl#";
pub const SKOS_NS: &str = "http://www.w3.org/2004/02/skos/core#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_PROPERTY: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Property";
pub const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
pub const RDFS_RESOURCE: &str = "http://www.w3.org/2000/01/rdf-schema#Resource";
pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
pub const RDFS_SUBPROPERTY_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subPropertyOf";
pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
pub const OWL_SAME_AS: &str = "http://www.w3.org/2002/07/owl#sameAs";
pub const SKOS_CONCEPT: &str = "http://www.w3.org/2004/02/skos/core#Concept";

/// SPARQL prologue declaring the prefixes used by the aggregate queries.
pub const SPARQL_PREFIXES: &str = "\
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX owl: <http://www.w3.org/2002/07/owl#>
PREFIX skos: <http://www.w3.org/2004/02/skos/core#>
";

/// Local-name suffix of an IRI: everything after the last `/` or `#`.
static RE_LOCAL_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^/#]*$").unwrap());

/// Strip the local name from an IRI, leaving its namespace prefix.
///
/// `http://xmlns.com/foaf/0.1/name` becomes `http://xmlns.com/foaf/0.1/`.
/// An IRI with no `/` or `#` yields the empty string.
pub fn namespace_of(iri: &str) -> &str {
    match RE_LOCAL_NAME.find(iri) {
        Some(m) => &iri[..m.start()],
        None => iri,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_slash_and_hash_local_names() {
        assert_eq!(namespace_of("http://xmlns.com/foaf/0.1/name"), "http://xmlns.com/foaf/0.1/");
        assert_eq!(namespace_of(RDF_TYPE), RDF_NS);
        assert_eq!(namespace_of("http://example.org/dir/"), "http://example.org/dir/");
        assert_eq!(namespace_of("urn:isbn:123"), "");
    }
}
