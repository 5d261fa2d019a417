//! Enrollment records and the confidential store that holds them
//!
//! Records are keyed by a fixed per-modality key (see
//! [`Modality::storage_key`]). Writing a record replaces the previous one
//! entirely; there is no history.

use super::digest::{SampleDigest, DIGEST_LEN};
use super::features::{FeatureVector, Modality};
use chacha20poly1305::{
    aead::{Aead, KeyInit, OsRng},
    XChaCha20Poly1305, XNonce,
};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use zeroize::Zeroizing;

/// Reference sample for one modality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub modality: Modality,
    pub digest: SampleDigest,
    pub features: FeatureVector,
    pub created_at: String,
}

impl EnrollmentRecord {
    pub fn new(modality: Modality, digest: SampleDigest, features: FeatureVector) -> Self {
        Self {
            modality,
            digest,
            features,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Check that the record has the shape live captures of `expected` produce
    pub fn check_shape(&self, expected: Modality) -> Result<(), String> {
        if self.modality != expected {
            return Err(format!(
                "record is for {}, expected {}",
                self.modality, expected
            ));
        }
        if self.features.len() != expected.feature_len() {
            return Err(format!(
                "{} features, expected {}",
                self.features.len(),
                expected.feature_len()
            ));
        }
        if self.digest.len() != DIGEST_LEN {
            return Err(format!(
                "digest length {}, expected {}",
                self.digest.len(),
                DIGEST_LEN
            ));
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Single-key confidential storage for enrollment records.
///
/// At-rest protection is the implementation's concern. Callers serialize
/// enrollment and authentication for the same modality.
pub trait EnrollmentStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<EnrollmentRecord>, StoreError>;

    fn put(&self, key: &str, record: &EnrollmentRecord) -> Result<(), StoreError>;

    /// Removing an absent key is not an error
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Volatile store, mainly for tests and demos
#[derive(Debug, Default)]
pub struct MemoryEnrollmentStore {
    records: RwLock<HashMap<String, EnrollmentRecord>>,
}

impl MemoryEnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnrollmentStore for MemoryEnrollmentStore {
    fn get(&self, key: &str) -> Result<Option<EnrollmentRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        Ok(records.get(key).cloned())
    }

    fn put(&self, key: &str, record: &EnrollmentRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        records.insert(key.to_string(), record.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        records.remove(key);
        Ok(())
    }
}

/// On-disk envelope for one encrypted record
#[derive(Serialize, Deserialize)]
struct EncryptedRecord {
    /// XChaCha20-Poly1305 nonce (192-bit)
    nonce: Vec<u8>,
    /// Encrypted JSON of the record
    ciphertext: Vec<u8>,
    /// Metadata (unencrypted)
    created_at: String,
}

/// Records encrypted with XChaCha20-Poly1305 under a per-installation key
pub struct EncryptedFileStore {
    dir: PathBuf,
    encryption_key: Zeroizing<[u8; 32]>,
}

impl EncryptedFileStore {
    /// Open (or initialize) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let encryption_key = Self::get_or_create_encryption_key(&dir)?;

        log::info!("Enrollment store opened at {}", dir.display());
        Ok(Self {
            dir,
            encryption_key,
        })
    }

    fn get_or_create_encryption_key(dir: &Path) -> Result<Zeroizing<[u8; 32]>, StoreError> {
        let key_path = dir.join(".key");

        if key_path.exists() {
            let key_bytes = Zeroizing::new(fs::read(&key_path)?);
            if key_bytes.len() != 32 {
                return Err(StoreError::Corrupt("invalid encryption key length".to_string()));
            }
            let mut key_array = Zeroizing::new([0u8; 32]);
            key_array.copy_from_slice(&key_bytes);
            return Ok(key_array);
        }

        let mut key_array = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut *key_array);
        fs::write(&key_path, &*key_array)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&key_path, fs::Permissions::from_mode(0o600))?;
        }

        log::info!("Generated new enrollment encryption key");
        Ok(key_array)
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.enrollment", key))
    }

    fn encrypt(&self, record: &EnrollmentRecord) -> Result<EncryptedRecord, StoreError> {
        let cipher = XChaCha20Poly1305::new((&*self.encryption_key).into());

        let mut nonce_bytes = [0u8; 24];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from(nonce_bytes);

        let plaintext = Zeroizing::new(
            serde_json::to_vec(record).map_err(|e| StoreError::Unavailable(e.to_string()))?,
        );
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|e| StoreError::Unavailable(format!("encryption failed: {:?}", e)))?;

        Ok(EncryptedRecord {
            nonce: nonce_bytes.to_vec(),
            ciphertext,
            created_at: record.created_at.clone(),
        })
    }

    fn decrypt(&self, encrypted: &EncryptedRecord) -> Result<EnrollmentRecord, StoreError> {
        let cipher = XChaCha20Poly1305::new((&*self.encryption_key).into());

        if encrypted.nonce.len() != 24 {
            return Err(StoreError::Corrupt("invalid nonce length".to_string()));
        }
        let nonce = XNonce::from_slice(&encrypted.nonce);

        let plaintext = Zeroizing::new(
            cipher
                .decrypt(nonce, encrypted.ciphertext.as_slice())
                .map_err(|_| StoreError::Corrupt("decryption failed".to_string()))?,
        );

        serde_json::from_slice(&plaintext).map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

impl EnrollmentStore for EncryptedFileStore {
    fn get(&self, key: &str) -> Result<Option<EnrollmentRecord>, StoreError> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)?;
        let encrypted: EncryptedRecord =
            serde_json::from_str(&json).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.decrypt(&encrypted).map(Some)
    }

    fn put(&self, key: &str, record: &EnrollmentRecord) -> Result<(), StoreError> {
        let encrypted = self.encrypt(record)?;
        let json = serde_json::to_string_pretty(&encrypted)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        fs::write(self.record_path(key), json)?;

        log::debug!("Stored enrollment record '{}'", key);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.record_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
            log::info!("Deleted enrollment record '{}'", key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice_record(seed: f64) -> EnrollmentRecord {
        EnrollmentRecord::new(
            Modality::Voice,
            SampleDigest::from_hex("0".repeat(DIGEST_LEN)),
            FeatureVector::new(vec![seed; 6]),
        )
    }

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryEnrollmentStore::new();
        assert!(store.get("voice_enrollment").unwrap().is_none());

        store.put("voice_enrollment", &voice_record(1.0)).unwrap();
        store.put("voice_enrollment", &voice_record(2.0)).unwrap();

        let record = store.get("voice_enrollment").unwrap().unwrap();
        assert_eq!(record.features.as_slice(), &[2.0; 6]);

        store.delete("voice_enrollment").unwrap();
        assert!(store.get("voice_enrollment").unwrap().is_none());
        store.delete("voice_enrollment").unwrap();
    }

    #[test]
    fn test_encrypted_store_roundtrip_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let record = voice_record(3.5);

        {
            let store = EncryptedFileStore::open(dir.path()).unwrap();
            store.put("voice_enrollment", &record).unwrap();
        }

        let store = EncryptedFileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("voice_enrollment").unwrap(), Some(record));
        assert!(store.get("iris_enrollment").unwrap().is_none());
    }

    #[test]
    fn test_encrypted_store_hides_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileStore::open(dir.path()).unwrap();
        store.put("voice_enrollment", &voice_record(1.0)).unwrap();

        let raw = fs::read_to_string(dir.path().join("voice_enrollment.enrollment")).unwrap();
        assert!(!raw.contains("features"));
        assert!(!raw.contains("voice"));
    }

    #[test]
    fn test_tampered_record_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileStore::open(dir.path()).unwrap();
        store.put("iris_enrollment", &voice_record(1.0)).unwrap();

        let path = dir.path().join("iris_enrollment.enrollment");
        let mut envelope: EncryptedRecord =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        envelope.ciphertext[0] ^= 0xff;
        fs::write(&path, serde_json::to_string(&envelope).unwrap()).unwrap();

        assert!(matches!(
            store.get("iris_enrollment"),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_wrong_key_cannot_decrypt() {
        let dir = tempfile::tempdir().unwrap();
        EncryptedFileStore::open(dir.path())
            .unwrap()
            .put("voice_enrollment", &voice_record(1.0))
            .unwrap();

        fs::write(dir.path().join(".key"), [7u8; 32]).unwrap();
        let store = EncryptedFileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.get("voice_enrollment"),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_check_shape() {
        let record = voice_record(1.0);
        assert!(record.check_shape(Modality::Voice).is_ok());
        assert!(record.check_shape(Modality::Iris).is_err());

        let mut short = voice_record(1.0);
        short.features = FeatureVector::new(vec![1.0; 5]);
        assert!(short.check_shape(Modality::Voice).is_err());
    }
}
