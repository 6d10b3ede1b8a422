fn main() {
    mmd_sweep::cli::run();
}
