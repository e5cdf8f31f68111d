//! Content fingerprints used to confirm that a color switch re-rendered the page.

use sha2::{Digest, Sha256};

use crate::page::PageHandle;

/// SHA-256 over the text and attributes of every element in `regions`.
pub async fn region_fingerprint(page: &dyn PageHandle, regions: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for selector in regions {
        hasher.update(selector.as_bytes());
        for element in page.query_all(selector).await {
            hasher.update([0x1e]);
            hasher.update(element.text.as_bytes());
            for (name, value) in &element.attributes {
                hasher.update([0x1f]);
                hasher.update(name.as_bytes());
                hasher.update([b'=']);
                hasher.update(value.as_bytes());
            }
        }
    }
    format!("{:x}", hasher.finalize())
}
