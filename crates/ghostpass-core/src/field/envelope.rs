//! Credential field: a sealed username/password pair with guarded handles

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::codec::{decode_pair, encode_pair, DecodedPair};
use crate::crypto::{Aes256GcmCipher, EnvelopeCipher, GuardedSecret, MasterKey};
use crate::error::{GhostpassError, Result};

/// An encrypted username/password combination.
///
/// Only `auth_pair` is ever persisted. The guarded handles are derived state
/// and can be rebuilt with [`Field::rederive`] given the right key.
///
/// A field is owned by one caller at a time; every mutating operation takes
/// `&mut self`, so concurrent mutation has to be serialized by the owner.
#[derive(Serialize, Deserialize)]
pub struct Field {
    #[serde(skip)]
    username: Option<GuardedSecret>,
    #[serde(skip)]
    password: Option<GuardedSecret>,

    /// Sealed pair; the only persisted representation of the credentials
    #[serde(rename = "authpair", with = "authpair_b64")]
    auth_pair: Vec<u8>,

    /// Decoy pairs for plausible deniability. NOT encrypted and not tied to
    /// any key yet, so they are kept out of serialization entirely.
    #[serde(skip)]
    deniable_pairs: Vec<GuardedSecret>,
}

impl Field {
    /// Seal a new field from a cleartext username and a guarded password
    pub fn new(key: &MasterKey, username: &str, password: GuardedSecret) -> Result<Self> {
        Self::new_with(&Aes256GcmCipher, key, username, password)
    }

    /// Same as [`Field::new`] with an explicit cipher
    pub fn new_with<C: EnvelopeCipher + ?Sized>(
        cipher: &C,
        key: &MasterKey,
        username: &str,
        password: GuardedSecret,
    ) -> Result<Self> {
        let auth_pair = {
            let clearpwd = password.open()?;
            let plaintext = encode_pair(username.as_bytes(), &clearpwd)?;
            cipher.seal(key, &plaintext)?
        };

        debug!("Sealed new field ({} byte auth pair)", auth_pair.len());

        Ok(Self {
            username: Some(GuardedSecret::from(username)),
            password: Some(password),
            auth_pair,
            deniable_pairs: Vec::new(),
        })
    }

    /// Rebuild a field from a stored auth pair by decrypting it with `key`
    pub fn reconstruct(key: &MasterKey, auth_pair: Vec<u8>) -> Result<Self> {
        Self::reconstruct_with(&Aes256GcmCipher, key, auth_pair)
    }

    /// Same as [`Field::reconstruct`] with an explicit cipher
    pub fn reconstruct_with<C: EnvelopeCipher + ?Sized>(
        cipher: &C,
        key: &MasterKey,
        auth_pair: Vec<u8>,
    ) -> Result<Self> {
        let mut field = Self::sealed(auth_pair);
        field.rederive_with(cipher, key)?;
        Ok(field)
    }

    /// A field holding only its auth pair, with no cleartext handles
    fn sealed(auth_pair: Vec<u8>) -> Self {
        Self {
            username: None,
            password: None,
            auth_pair,
            deniable_pairs: Vec::new(),
        }
    }

    /// Re-derive the username and password handles from the auth pair.
    ///
    /// Used after deserializing a field, where only the auth pair exists.
    /// On error the existing handles are left untouched.
    pub fn rederive(&mut self, key: &MasterKey) -> Result<()> {
        self.rederive_with(&Aes256GcmCipher, key)
    }

    /// Same as [`Field::rederive`] with an explicit cipher
    pub fn rederive_with<C: EnvelopeCipher + ?Sized>(
        &mut self,
        cipher: &C,
        key: &MasterKey,
    ) -> Result<()> {
        if self.auth_pair.is_empty() {
            return Err(GhostpassError::MissingSecret);
        }

        let plaintext = cipher.open(key, &self.auth_pair)?;
        let pair = decode_pair(&plaintext)?;

        // TODO: a key derived from a deniable pair should open this same blob
        // into the decoy pair; that needs a multi-key construction for auth_pair.
        let username = GuardedSecret::new(pair.username.as_bytes().to_vec());
        let password = GuardedSecret::new(pair.password.as_bytes().to_vec());

        self.username = Some(username);
        self.password = Some(password);

        debug!("Rederived field credentials");
        Ok(())
    }

    /// Attach a decoy username/password pair.
    ///
    /// The pair is stored encoded but unencrypted, in memory only.
    pub fn add_deniable_secret(&mut self, username: &str, password: &GuardedSecret) -> Result<()> {
        let encoded = {
            let clearpwd = password.open()?;
            encode_pair(username.as_bytes(), &clearpwd)?
        };

        self.deniable_pairs.push(GuardedSecret::new(encoded.to_vec()));
        debug!("Added deniable pair ({} total)", self.deniable_pairs.len());
        Ok(())
    }

    /// Number of attached deniable pairs
    pub fn deniable_count(&self) -> usize {
        self.deniable_pairs.len()
    }

    /// Decode the deniable pair at `index`, if any
    pub fn deniable_pair(&self, index: usize) -> Result<Option<DecodedPair>> {
        match self.deniable_pairs.get(index) {
            Some(entry) => decode_pair(&entry.open()?).map(Some),
            None => Ok(None),
        }
    }

    /// Both handles, or an error if the field has not been rederived
    pub fn credentials(&self) -> Result<(&GuardedSecret, &GuardedSecret)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pwd)) => Ok((user, pwd)),
            _ => Err(GhostpassError::GuardedSecret(
                "field has not been rederived".to_string(),
            )),
        }
    }

    /// Whether the cleartext handles are currently populated
    pub fn is_derived(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// The sealed auth pair
    pub fn auth_pair(&self) -> &[u8] {
        &self.auth_pair
    }

    /// Wipe the cleartext handles and deniable pairs, keeping the auth pair
    pub fn forget_cleartext(&mut self) {
        self.username = None;
        self.password = None;
        self.deniable_pairs.clear();
    }

    /// Hex form of the auth pair, for moving a single field between stores
    pub fn to_hex(&self) -> String {
        hex::encode(&self.auth_pair)
    }

    /// Reconstruct a field from the output of [`Field::to_hex`]
    pub fn from_hex(key: &MasterKey, encoded: &str) -> Result<Self> {
        let auth_pair = hex::decode(encoded.trim())
            .map_err(|e| GhostpassError::InvalidInput(format!("Invalid auth pair hex: {}", e)))?;
        Self::reconstruct(key, auth_pair)
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("derived", &self.is_derived())
            .field("auth_pair_len", &self.auth_pair.len())
            .field("deniable_pairs", &self.deniable_pairs.len())
            .finish()
    }
}

mod authpair_b64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeroize::Zeroizing;

    fn open_str(secret: &GuardedSecret) -> String {
        secret.open().unwrap().as_str().unwrap().to_string()
    }

    /// Cipher whose seal always faults
    struct FaultyCipher;

    impl EnvelopeCipher for FaultyCipher {
        fn seal(&self, _key: &MasterKey, _plaintext: &[u8]) -> Result<Vec<u8>> {
            Err(GhostpassError::Encryption("primitive fault".to_string()))
        }

        fn open(&self, _key: &MasterKey, _sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
            Err(GhostpassError::Authentication)
        }
    }

    #[test]
    fn test_new_populates_field() {
        let key = MasterKey::generate();
        let field = Field::new(&key, "alice", GuardedSecret::from("s3cret")).unwrap();

        assert!(!field.auth_pair().is_empty());
        assert!(field.is_derived());
        assert_eq!(field.deniable_count(), 0);

        let (user, pwd) = field.credentials().unwrap();
        assert_eq!(open_str(user), "alice");
        assert_eq!(open_str(pwd), "s3cret");
    }

    #[test]
    fn test_roundtrip_through_reconstruct() {
        let key = MasterKey::generate();
        let field = Field::new(&key, "alice", GuardedSecret::from("s3cret")).unwrap();

        let restored = Field::reconstruct(&key, field.auth_pair().to_vec()).unwrap();
        assert_eq!(open_str(restored.credentials().unwrap().0), "alice");
        assert_eq!(open_str(restored.credentials().unwrap().1), "s3cret");
    }

    #[test]
    fn test_wrong_key_is_authentication_error() {
        let field = Field::new(&MasterKey::generate(), "alice", GuardedSecret::from("pw")).unwrap();

        let result = Field::reconstruct(&MasterKey::generate(), field.auth_pair().to_vec());
        assert!(matches!(result, Err(GhostpassError::Authentication)));
    }

    #[test]
    fn test_tampered_auth_pair_is_authentication_error() {
        let key = MasterKey::generate();
        let field = Field::new(&key, "alice", GuardedSecret::from("pw")).unwrap();

        let mut tampered = field.auth_pair().to_vec();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;

        let result = Field::reconstruct(&key, tampered);
        assert!(matches!(result, Err(GhostpassError::Authentication)));
    }

    #[test]
    fn test_empty_auth_pair_is_missing_secret() {
        let result = Field::reconstruct(&MasterKey::generate(), Vec::new());
        assert!(matches!(result, Err(GhostpassError::MissingSecret)));

        // an empty blob can only arrive through a store file
        let mut field: Field = serde_json::from_str(r#"{"authpair":""}"#).unwrap();
        assert!(matches!(
            field.rederive(&MasterKey::generate()),
            Err(GhostpassError::MissingSecret)
        ));
    }

    #[test]
    fn test_password_with_separator_roundtrips() {
        let key = MasterKey::generate();
        let field = Field::new(&key, "alice", GuardedSecret::from("pa:ss")).unwrap();

        let restored = Field::reconstruct(&key, field.auth_pair().to_vec()).unwrap();
        assert_eq!(open_str(restored.credentials().unwrap().0), "alice");
        assert_eq!(open_str(restored.credentials().unwrap().1), "pa:ss");
    }

    #[test]
    fn test_legacy_blob_splits_on_first_separator() {
        let key = MasterKey::generate();
        let blob = Aes256GcmCipher.seal(&key, b"alice:pa:ss").unwrap();

        let restored = Field::reconstruct(&key, blob).unwrap();
        assert_eq!(open_str(restored.credentials().unwrap().0), "alice");
        assert_eq!(open_str(restored.credentials().unwrap().1), "pa:ss");
    }

    #[test]
    fn test_plaintext_without_separator_is_malformed() {
        let key = MasterKey::generate();
        let blob = Aes256GcmCipher.seal(&key, b"justausername").unwrap();

        let result = Field::reconstruct(&key, blob);
        assert!(matches!(result, Err(GhostpassError::MalformedPlaintext(_))));
    }

    #[test]
    fn test_destroyed_password_fails_construction() {
        let mut password = GuardedSecret::from("pw");
        password.destroy();

        let result = Field::new(&MasterKey::generate(), "alice", password);
        assert!(matches!(result, Err(GhostpassError::GuardedSecret(_))));
    }

    #[test]
    fn test_seal_fault_propagates() {
        let result = Field::new_with(
            &FaultyCipher,
            &MasterKey::generate(),
            "alice",
            GuardedSecret::from("pw"),
        );
        assert!(matches!(result, Err(GhostpassError::Encryption(_))));
    }

    #[test]
    fn test_failed_rederive_keeps_existing_handles() {
        let key = MasterKey::generate();
        let mut field = Field::new(&key, "alice", GuardedSecret::from("pw")).unwrap();

        let result = field.rederive(&MasterKey::generate());
        assert!(matches!(result, Err(GhostpassError::Authentication)));

        let result = field.rederive_with(&FaultyCipher, &key);
        assert!(matches!(result, Err(GhostpassError::Authentication)));

        assert_eq!(open_str(field.credentials().unwrap().0), "alice");
        assert_eq!(open_str(field.credentials().unwrap().1), "pw");
    }

    #[test]
    fn test_rederive_replaces_forgotten_handles() {
        let key = MasterKey::generate();
        let mut field = Field::new(&key, "alice", GuardedSecret::from("pw")).unwrap();

        field.forget_cleartext();
        assert!(!field.is_derived());
        assert!(field.credentials().is_err());

        field.rederive(&key).unwrap();
        assert_eq!(open_str(field.credentials().unwrap().1), "pw");
    }

    #[test]
    fn test_add_deniable_secret() {
        let key = MasterKey::generate();
        let mut field = Field::new(&key, "alice", GuardedSecret::from("pw")).unwrap();
        let auth_pair = field.auth_pair().to_vec();

        field
            .add_deniable_secret("bob", &GuardedSecret::from("decoy"))
            .unwrap();

        assert_eq!(field.deniable_count(), 1);
        let pair = field.deniable_pair(0).unwrap().unwrap();
        assert_eq!(pair.username.as_str(), "bob");
        assert_eq!(pair.password.as_str(), "decoy");
        assert!(field.deniable_pair(1).unwrap().is_none());

        // decoys are independent of the sealed pair
        assert_eq!(field.auth_pair(), auth_pair.as_slice());
        field.rederive(&key).unwrap();
        assert_eq!(open_str(field.credentials().unwrap().0), "alice");
    }

    #[test]
    fn test_add_deniable_secret_with_destroyed_password() {
        let key = MasterKey::generate();
        let mut field = Field::new(&key, "alice", GuardedSecret::from("pw")).unwrap();

        let mut decoy = GuardedSecret::from("decoy");
        decoy.destroy();

        assert!(field.add_deniable_secret("bob", &decoy).is_err());
        assert_eq!(field.deniable_count(), 0);
    }

    #[test]
    fn test_serialization_only_carries_auth_pair() {
        let key = MasterKey::generate();
        let mut field = Field::new(&key, "alice", GuardedSecret::from("s3cret")).unwrap();
        field
            .add_deniable_secret("bob", &GuardedSecret::from("decoy"))
            .unwrap();

        let json = serde_json::to_string(&field).unwrap();
        assert!(json.contains("authpair"));
        assert!(!json.contains("alice"));
        assert!(!json.contains("s3cret"));
        assert!(!json.contains("decoy"));

        let mut loaded: Field = serde_json::from_str(&json).unwrap();
        assert!(!loaded.is_derived());
        assert_eq!(loaded.deniable_count(), 0);

        loaded.rederive(&key).unwrap();
        assert_eq!(open_str(loaded.credentials().unwrap().0), "alice");
    }

    #[test]
    fn test_hex_export_import() {
        let key = MasterKey::generate();
        let field = Field::new(&key, "alice", GuardedSecret::from("pw")).unwrap();

        let restored = Field::from_hex(&key, &field.to_hex()).unwrap();
        assert_eq!(open_str(restored.credentials().unwrap().1), "pw");

        assert!(matches!(
            Field::from_hex(&key, "zz"),
            Err(GhostpassError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_debug_redacted() {
        let field = Field::new(&MasterKey::generate(), "alice", GuardedSecret::from("s3cret")).unwrap();
        let debug = format!("{:?}", field);
        assert!(!debug.contains("alice"));
        assert!(!debug.contains("s3cret"));
    }
}
