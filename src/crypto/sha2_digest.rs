//! Default [`Digester`] backed by the `sha2` crate.

use sha2::{Digest as _, Sha256, Sha384, Sha512};

use super::{Digest, Digester, HashAlgorithm};

enum Session {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl Digest for Session {
    fn update(&mut self, data: &[u8]) {
        match self {
            Session::Sha256(h) => h.update(data),
            Session::Sha384(h) => h.update(data),
            Session::Sha512(h) => h.update(data),
        }
    }

    fn finish(self: Box<Self>) -> Vec<u8> {
        match *self {
            Session::Sha256(h) => h.finalize().to_vec(),
            Session::Sha384(h) => h.finalize().to_vec(),
            Session::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

/// A [`Digester`] for one of the three C2PA-recognized SHA-2 variants.
pub struct Sha2Digester(HashAlgorithm);

impl Sha2Digester {
    pub fn new(alg: HashAlgorithm) -> Self {
        Self(alg)
    }
}

impl Digester for Sha2Digester {
    fn algorithm(&self) -> HashAlgorithm {
        self.0
    }

    fn start(&self) -> Box<dyn Digest> {
        Box::new(match self.0 {
            HashAlgorithm::Sha256 => Session::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => Session::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => Session::Sha512(Sha512::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digests_known_value() {
        let digester = Sha2Digester::new(HashAlgorithm::Sha256);
        let digest = digester.digest(b"");
        assert_eq!(
            hex_encode(&digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn streaming_matches_one_shot() {
        let digester = Sha2Digester::new(HashAlgorithm::Sha384);
        let one_shot = digester.digest(b"hello c2pa");

        let mut session = digester.start();
        session.update(b"hello ");
        session.update(b"c2pa");
        let streamed = session.finish();

        assert_eq!(one_shot, streamed);
    }

    fn hex_encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}
