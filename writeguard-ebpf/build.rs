use which::which;

// Building this crate requires the `bpf-linker` binary on PATH; rebuild when
// it changes so a linker upgrade is picked up.
fn main() {
	let bpf_linker = which("bpf-linker").expect("bpf-linker not found on PATH");
	println!("cargo:rerun-if-changed={}", bpf_linker.to_str().expect("non UTF-8 bpf-linker path"));
}
