use serde_json::{Value, json};
use sha2::{Digest, Sha256};

pub const MANIFEST_ID: &str = "spritecut.manifest";
pub const MANIFEST_VERSION: u64 = 1;

// One emitted asset as listed in `manifest.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub id: String,
    pub name: String,
    pub file_name: String,
    pub width: f64,
    pub height: f64,
    // Hex SHA-256 of the asset markup.
    pub sha256: String,
}

impl ManifestEntry {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        file_name: impl Into<String>,
        width: f64,
        height: f64,
        markup: &str,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            file_name: file_name.into(),
            width,
            height,
            sha256: hex_sha256(markup.as_bytes()),
        }
    }

    pub fn to_json_value(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "file": self.file_name,
            "width": self.width,
            "height": self.height,
            "sha256": self.sha256,
        })
    }

    fn from_json_value(value: &Value) -> Result<Self, String> {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| format!("manifest entry is missing string field {key:?}"))
        };
        let number = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_f64)
                .ok_or_else(|| format!("manifest entry is missing numeric field {key:?}"))
        };
        Ok(Self {
            id: text("id")?,
            name: text("name")?,
            file_name: text("file")?,
            width: number("width")?,
            height: number("height")?,
            sha256: text("sha256")?,
        })
    }
}

// Pure data: the list of emitted assets, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    // Digest over the manifest id, version and every entry's identity and
    // content hash. Stable for identical outputs.
    pub fn fingerprint_sha256(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(MANIFEST_ID.as_bytes());
        hasher.update(b"\n");
        hasher.update(MANIFEST_VERSION.to_string().as_bytes());
        for entry in &self.entries {
            hasher.update(b"\n");
            hasher.update(entry.id.as_bytes());
            hasher.update(b"\t");
            hasher.update(entry.file_name.as_bytes());
            hasher.update(b"\t");
            hasher.update(entry.sha256.as_bytes());
        }
        to_hex(&hasher.finalize())
    }

    pub fn to_json_value(&self) -> Value {
        let assets: Vec<Value> = self.entries.iter().map(ManifestEntry::to_json_value).collect();
        json!({
            "manifest": MANIFEST_ID,
            "version": MANIFEST_VERSION,
            "count": self.entries.len(),
            "fingerprint_sha256": self.fingerprint_sha256(),
            "assets": assets,
        })
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_value())
            .unwrap_or_else(|_| self.to_json_value().to_string())
    }

    pub fn from_json_str(text: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(text).map_err(|err| err.to_string())?;
        if value.get("manifest").and_then(Value::as_str) != Some(MANIFEST_ID) {
            return Err(format!("not a {MANIFEST_ID} document"));
        }
        match value.get("version").and_then(Value::as_u64) {
            Some(MANIFEST_VERSION) => {}
            other => return Err(format!("unsupported manifest version {other:?}")),
        }
        let assets = value
            .get("assets")
            .and_then(Value::as_array)
            .ok_or_else(|| "manifest has no assets array".to_string())?;
        let entries = assets
            .iter()
            .map(ManifestEntry::from_json_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }
}

pub fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    to_hex(&hasher.finalize())
}

fn to_hex(digest: &[u8]) -> String {
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        Manifest::new(vec![
            ManifestEntry::new("asset-0", "us", "us.svg", 128.0, 128.0, "<svg/>"),
            ManifestEntry::new("asset-1", "fr", "fr.svg", 128.0, 96.5, "<svg></svg>"),
        ])
    }

    #[test]
    fn hashes_are_lowercase_hex() {
        assert_eq!(
            hex_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let entry = &sample().entries[0];
        assert_eq!(entry.sha256.len(), 64);
        assert!(entry.sha256.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a.fingerprint_sha256(), b.fingerprint_sha256());
        b.entries[1] = ManifestEntry::new("asset-1", "fr", "fr.svg", 128.0, 96.5, "<svg>x</svg>");
        assert_ne!(a.fingerprint_sha256(), b.fingerprint_sha256());
    }

    #[test]
    fn json_lists_every_asset() {
        let value = sample().to_json_value();
        assert_eq!(value["manifest"], MANIFEST_ID);
        assert_eq!(value["count"], 2);
        assert_eq!(value["assets"][1]["id"], "asset-1");
        assert_eq!(value["assets"][1]["file"], "fr.svg");
        assert_eq!(value["assets"][1]["height"], 96.5);
    }

    #[test]
    fn json_string_reads_back() {
        let manifest = sample();
        let text = manifest.to_json_string();
        assert_eq!(Manifest::from_json_str(&text), Ok(manifest));
        assert!(Manifest::from_json_str("{\"manifest\":\"other\"}").is_err());
        assert!(Manifest::from_json_str("[").is_err());
    }
}
