use pdf_sign_request::{
    MemoryStore, SignOutcome, SigningConfig, SigningService, UploadDirectory,
};
use std::{fs::File, io::Write, path::Path};

// Usage: cargo run --example sign_request -- <document.pdf> <signature.png> [config.json]
fn main() {
    let mut args = std::env::args().skip(1);
    let pdf_path = args.next().expect("Path to a PDF document.");
    let signature_path = args.next().expect("Path to a signature image.");
    let config = match args.next() {
        Some(config_path) => SigningConfig::from_json_file(config_path).unwrap(),
        None => SigningConfig::default(),
    };

    let pdf_path = Path::new(&pdf_path);
    let upload_dir = pdf_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = pdf_path.file_name().unwrap().to_str().unwrap();

    let service =
        SigningService::new(MemoryStore::new(), UploadDirectory::new(upload_dir), config).unwrap();
    let request = service.create(file_name, file_name).unwrap();
    println!(
        "Created request `{}`, signable until {}.",
        request.id, request.expires_at
    );

    // The drawing pad posts its canvas as a data URL.
    let signature = std::fs::read(signature_path).unwrap();
    let data_url = format!("data:image/png;base64,{}", base64::encode(signature));

    match service.sign(&request.id, &data_url).unwrap() {
        SignOutcome::Signed => {
            let download = service.download(&request.id).unwrap();
            let mut pdf_file = File::create(&download.file_name).unwrap();
            pdf_file.write_all(&download.data).unwrap();
            println!("Wrote `{}` (etag {}).", download.file_name, download.etag());
        }
        outcome => println!("Not signed: {:?}", outcome),
    }
}
