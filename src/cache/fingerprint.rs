//! Content fingerprint of a photo list, used for change detection.

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::flickr::Photo;

/// Bump when the canonical serialization of `Photo` changes. Every stored
/// fingerprint then mismatches and the next fetch is treated as new content.
const FORMAT_VERSION: &str = "v1";

/// Bytes of the digest kept in the fingerprint
const DIGEST_BYTES: usize = 16;

/// Fingerprint of an ordered photo list.
///
/// SHA-256 over the JSON serialization of the slice. Field order follows the
/// struct declaration, so equal lists always hash equally.
pub fn fingerprint(photos: &[Photo]) -> String {
  let mut hasher = Sha256::new();
  for photo in photos {
    let bytes = match serde_json::to_vec(photo) {
      Ok(bytes) => bytes,
      Err(e) => {
        // Still covers every field, so the photo keeps counting
        warn!(id = %photo.id, error = %e, "photo did not serialize, hashing debug form");
        format!("{:?}", photo).into_bytes()
      }
    };
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(&bytes);
  }
  let digest = hasher.finalize();

  format!("{}:{}", FORMAT_VERSION, hex::encode(&digest[..DIGEST_BYTES]))
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::{Rng, SeedableRng};

  fn photo(id: &str) -> Photo {
    Photo {
      id: id.to_string(),
      title: format!("title {}", id),
      url: Some(format!("https://live.staticflickr.com/1/{}_x_m.jpg", id)),
      owner: "owner".to_string(),
      server: "1".to_string(),
      secret: "x".to_string(),
    }
  }

  fn sample() -> Vec<Photo> {
    (0..20).map(|i| photo(&i.to_string())).collect()
  }

  #[test]
  fn test_deterministic() {
    let photos = sample();
    assert_eq!(fingerprint(&photos), fingerprint(&photos));
    assert_eq!(fingerprint(&photos), fingerprint(&photos.clone()));
  }

  #[test]
  fn test_format() {
    let fp = fingerprint(&sample());
    assert!(fp.starts_with("v1:"));
    assert_eq!(fp.len(), 3 + DIGEST_BYTES * 2);
  }

  #[test]
  fn test_sensitive_to_every_field() {
    let base = sample();
    let original = fingerprint(&base);

    let mutations: [fn(&mut Photo); 6] = [
      |p: &mut Photo| p.id.push('0'),
      |p: &mut Photo| p.title.push('!'),
      |p: &mut Photo| p.url = None,
      |p: &mut Photo| p.owner = "someone else".to_string(),
      |p: &mut Photo| p.server = "2".to_string(),
      |p: &mut Photo| p.secret = "y".to_string(),
    ];

    for (index, mutate) in mutations.iter().enumerate() {
      for position in [0, 7, 19] {
        let mut changed = base.clone();
        mutate(&mut changed[position]);
        assert_ne!(
          fingerprint(&changed),
          original,
          "mutation {} at position {} went unnoticed",
          index,
          position
        );
      }
    }
  }

  #[test]
  fn test_random_mutations_change_fingerprint() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let base = sample();
    let original = fingerprint(&base);

    for round in 0..500 {
      let mut changed = base.clone();
      let position = rng.gen_range(0..changed.len());
      let suffix = rng.gen_range(0..10_000u32).to_string();
      let target = &mut changed[position];
      match rng.gen_range(0..6) {
        0 => target.id.push_str(&suffix),
        1 => target.title.push_str(&suffix),
        2 => target.url = Some(suffix.clone()),
        3 => target.owner.push_str(&suffix),
        4 => target.server.push_str(&suffix),
        _ => target.secret.push_str(&suffix),
      }

      assert_ne!(
        fingerprint(&changed),
        original,
        "round {} at position {} went unnoticed",
        round,
        position
      );
    }
  }

  #[test]
  fn test_random_swaps_change_fingerprint() {
    let mut rng = StdRng::seed_from_u64(42);
    let base = sample();
    let original = fingerprint(&base);

    for _ in 0..200 {
      let a = rng.gen_range(0..base.len());
      let b = rng.gen_range(0..base.len());
      if a == b {
        continue;
      }
      let mut swapped = base.clone();
      swapped.swap(a, b);
      assert_ne!(fingerprint(&swapped), original, "swap {} <-> {}", a, b);
    }
  }

  #[test]
  fn test_sensitive_to_order() {
    let base = sample();
    let original = fingerprint(&base);

    for i in 0..base.len() - 1 {
      let mut swapped = base.clone();
      swapped.swap(i, i + 1);
      assert_ne!(fingerprint(&swapped), original);
    }

    let mut reversed = base;
    reversed.reverse();
    assert_ne!(fingerprint(&reversed), original);
  }

  #[test]
  fn test_field_boundaries_matter() {
    // Moving text between adjacent fields must not collide
    let mut a = photo("1");
    a.owner = "ab".to_string();
    a.server = "c".to_string();
    let mut b = photo("1");
    b.owner = "a".to_string();
    b.server = "bc".to_string();

    assert_ne!(fingerprint(&[a]), fingerprint(&[b]));
  }

  #[test]
  fn test_length_matters() {
    let base = sample();
    assert_ne!(fingerprint(&base[..19]), fingerprint(&base));
    assert_ne!(fingerprint(&[]), fingerprint(&base[..1]));
  }
}
