fn main() {
    // ESP-IDF link arguments are only needed when cross-compiling with the
    // `espidf` feature; host builds use the simulated board.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
