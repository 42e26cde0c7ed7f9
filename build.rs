fn main() {
    println!("cargo:rerun-if-env-changed=SOILWATCH_CONFIG");

    // Only the device build needs the ESP-IDF environment; host test
    // builds run without the `espidf` feature.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
