use serde::{Serialize, Serializer};

/// A named nucleotide sequence.
///
/// Residues are stored uppercase. The MD5 checksum of the residues is computed
/// once at construction and used to spot duplicate sequences in listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    name: String,
    bases: Vec<u8>,
    md5: String,
}

impl Sequence {
    pub fn new(name: impl Into<String>, bases: impl AsRef<[u8]>) -> Self {
        let bases: Vec<u8> = bases
            .as_ref()
            .iter()
            .map(u8::to_ascii_uppercase)
            .collect();
        let md5 = format!("{:x}", md5::compute(&bases));

        Self {
            name: name.into(),
            bases,
            md5,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The same residues under another name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    /// Lowercase hex MD5 of the uppercase residues
    pub fn md5(&self) -> &str {
        &self.md5
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

/// Summary view used in JSON listings; residues are never serialized
impl Serialize for Sequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Sequence", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("length", &self.bases.len())?;
        state.serialize_field("md5", &self.md5)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_uppercased() {
        let seq = Sequence::new("s1", "acgtN");
        assert_eq!(seq.bases(), b"ACGTN");
        assert_eq!(seq.len(), 5);
        assert_eq!(seq.name(), "s1");
    }

    #[test]
    fn test_md5_ignores_case() {
        // "ACGT" uppercase -> MD5 = f1f8f4bf413b16ad135722aa4591043e
        let upper = Sequence::new("a", "ACGT");
        let lower = Sequence::new("b", "acgt");
        assert_eq!(upper.md5(), "f1f8f4bf413b16ad135722aa4591043e");
        assert_eq!(upper.md5(), lower.md5());
    }

    #[test]
    fn test_serialize_omits_bases() {
        let seq = Sequence::new("s1", "ACGT");
        let json = serde_json::to_value(&seq).unwrap();
        assert_eq!(json["name"], "s1");
        assert_eq!(json["length"], 4);
        assert!(json.get("bases").is_none());
    }
}
