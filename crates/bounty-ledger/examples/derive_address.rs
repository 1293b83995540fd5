use bounty_ledger::keys;
use bounty_ledger::AccountAddress;

fn main() {
    let funder = AccountAddress::from_bytes([0xAA; 32]);
    let worker = AccountAddress::from_bytes([0xBB; 32]);

    let treasury = keys::treasury_address();
    let escrow = keys::escrow_address(funder, "QmExampleDescriptionHash");
    let profile = keys::profile_address(worker);

    println!("=== Derived ledger addresses ===");
    println!(
        "Treasury (seed '{}'): {}",
        keys::TREASURY_SEED,
        treasury.to_bech32().expect("Failed to encode")
    );
    println!(
        "Escrow for funder {}: {}",
        funder,
        escrow.to_bech32().expect("Failed to encode")
    );
    println!(
        "Profile for worker {}: {}",
        worker,
        profile.to_bech32().expect("Failed to encode")
    );
    println!(
        "Escrow (hex): 0x{}",
        hex::encode(escrow.as_bytes())
    );
}
