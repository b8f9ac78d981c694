fn main() {
    uniffi::generate_scaffolding("src/meshnode.udl").expect("failed to generate UniFFI scaffolding");
}
