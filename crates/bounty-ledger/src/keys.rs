use crate::types::AccountAddress;
use blake3::Hasher;

/// Domain separator so derived addresses can never collide with hashes
/// computed elsewhere in the system (tx hashes, content digests).
const DERIVE_DOMAIN: &[u8] = b"bounty-ledger/derive/v1";

/// Role tag for the treasury singleton. The deployed program uses
/// `treasury_v1`; older client scripts used `treasury`. This literal is
/// canonical and must never change.
pub const TREASURY_SEED: &str = "treasury_v1";
pub const ESCROW_SEED: &str = "bounty";
pub const PROFILE_SEED: &str = "profile";

/// Maps `(role tag, seeds…)` to a deterministic 32-byte address with no
/// private counterpart. Every seed is length-prefixed, so seed lists that
/// merely concatenate to the same bytes derive different addresses.
pub fn derive_address(tag: &str, seeds: &[&[u8]]) -> AccountAddress {
    let mut hasher = Hasher::new();
    hasher.update(DERIVE_DOMAIN);
    hasher.update(&(tag.len() as u64).to_le_bytes());
    hasher.update(tag.as_bytes());
    for seed in seeds {
        hasher.update(&(seed.len() as u64).to_le_bytes());
        hasher.update(seed);
    }
    AccountAddress::from_bytes(*hasher.finalize().as_bytes())
}

pub fn treasury_address() -> AccountAddress {
    derive_address(TREASURY_SEED, &[])
}

pub fn escrow_address(funder: AccountAddress, description_hash: &str) -> AccountAddress {
    derive_address(
        ESCROW_SEED,
        &[funder.as_bytes(), description_hash.as_bytes()],
    )
}

pub fn profile_address(worker: AccountAddress) -> AccountAddress {
    derive_address(PROFILE_SEED, &[worker.as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let funder = AccountAddress::from_bytes([7; 32]);

        let a = escrow_address(funder, "QmHash");
        let b = escrow_address(funder, "QmHash");
        assert_eq!(a, b);

        assert_eq!(treasury_address(), treasury_address());
        assert_eq!(profile_address(funder), profile_address(funder));
    }

    #[test]
    fn test_distinct_seeds_distinct_addresses() {
        let funder1 = AccountAddress::from_bytes([1; 32]);
        let funder2 = AccountAddress::from_bytes([2; 32]);

        assert_ne!(
            escrow_address(funder1, "QmHash"),
            escrow_address(funder2, "QmHash")
        );
        assert_ne!(
            escrow_address(funder1, "QmHashA"),
            escrow_address(funder1, "QmHashB")
        );
    }

    #[test]
    fn test_role_tags_partition_the_address_space() {
        let identity = AccountAddress::from_bytes([9; 32]);

        let as_escrow = derive_address(ESCROW_SEED, &[identity.as_bytes()]);
        let as_profile = derive_address(PROFILE_SEED, &[identity.as_bytes()]);
        assert_ne!(as_escrow, as_profile);
        assert_ne!(as_profile, treasury_address());
    }

    #[test]
    fn test_length_prefix_prevents_concatenation_collisions() {
        let a = derive_address("tag", &[b"ab", b"c"]);
        let b = derive_address("tag", &[b"a", b"bc"]);
        let c = derive_address("tag", &[b"abc"]);

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }
}
