fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only rerun if proto files change
    println!("cargo:rerun-if-changed=proto/eventgateway.proto");

    // protoc is unavailable in this environment; protox compiles the proto
    // to a descriptor set in pure Rust, which tonic-build then consumes.
    let file_descriptors = protox::compile(["proto/eventgateway.proto"], ["proto"])?;
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_fds(file_descriptors)?;
    Ok(())
}
