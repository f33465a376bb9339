use std::path::PathBuf;
#[allow(clippy::unwrap_used)]
fn main() {
    let out_dir = PathBuf::from("../cobalt/src/proto");
    let proto_dir = "../proto";

    eprintln!("Hi brave developer! If you are changing protos and cobalt fails to build, please retry 1 time.");
    eprintln!("Cargo currently does not have a nice way for me to express a dependency order between these 2");
    eprintln!("workspace projects - because this project is _specifically_ supposed to not be a Cargo dependency.");
    eprintln!("I did this so users don't need to have protoc when compiling cobalt!");

    prost_build::Config::new()
        .out_dir(out_dir.clone())
        .compile_protos(
            &[
                format!("{proto_dir}/cobalt/config.proto"),
                format!("{proto_dir}/cobalt/observation.proto"),
                format!("{proto_dir}/cobalt/local_aggregation.proto"),
            ],
            &[proto_dir],
        )
        .unwrap();

    // shuffler.proto is the only one of the four that declares an RPC
    // service, so it goes through tonic_build instead of prost_build. Client
    // code only; cobalt never runs the shuffler side of this service.
    tonic_build::configure()
        .build_server(false)
        .out_dir(out_dir)
        .compile(&[format!("{proto_dir}/cobalt/shuffler.proto")], &[proto_dir])
        .unwrap();

    println!("cargo:rerun-if-changed=../proto");
}
