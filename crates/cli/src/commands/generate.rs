//! `atelier generate` -- single gateway calls from files on disk.

use std::path::Path;

use atelier_core::{GenerationGateway, ImageRef, InlineImage, PoseCatalog, TryOnError};
use atelier_gemini::GeminiGateway;

use super::{fail, print_json, CliError};
use crate::{GenerateCommands, OutputFormat};

pub(crate) fn cmd_generate(
    command: GenerateCommands,
    catalog: &PoseCatalog,
    output: OutputFormat,
    quiet: bool,
) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => fail(CliError::Runtime(e), output, quiet),
    };
    let out = command.out().to_path_buf();
    match runtime.block_on(run(command, catalog)) {
        Ok(image) => match write_image(&out, &image) {
            Ok(()) => report(&out, &image, output, quiet),
            Err(e) => fail(e, output, quiet),
        },
        Err(e) => fail(e, output, quiet),
    }
}

async fn run(command: GenerateCommands, catalog: &PoseCatalog) -> Result<InlineImage, CliError> {
    // Inputs are validated before the gateway is built so a bad file is
    // reported even without credentials.
    let result = match command {
        GenerateCommands::Model { photo, .. } => {
            let photo = read_image(&photo)?;
            let gateway = GeminiGateway::from_env()?;
            gateway
                .create_base_model(&photo)
                .await
                .map_err(|e| CliError::gateway("Failed to create model", e))?
        }
        GenerateCommands::TryOn { model, garment, .. } => {
            let model = read_image(&model)?.to_image_ref();
            let garment = garment_ref(&garment)?;
            let gateway = GeminiGateway::from_env()?;
            gateway
                .apply_garment_to_image(&model, &garment)
                .await
                .map_err(|e| CliError::gateway("Failed to apply garment", e))?
        }
        GenerateCommands::Pose { image, pose, .. } => {
            let instruction = catalog.get(pose).ok_or(TryOnError::PoseOutOfRange {
                index: pose,
                len: catalog.len(),
            })?;
            let image = read_image(&image)?.to_image_ref();
            let gateway = GeminiGateway::from_env()?;
            gateway
                .render_pose(&image, instruction)
                .await
                .map_err(|e| CliError::gateway("Failed to change pose", e))?
        }
    };
    InlineImage::from_data_url(result.as_str()).map_err(CliError::Output)
}

/// Read a file and make sure it holds an image.
fn read_image(path: &Path) -> Result<InlineImage, CliError> {
    let data = std::fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path.file_name().and_then(|n| n.to_str());
    InlineImage::sniff(data, file_name).map_err(|source| CliError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// A garment is either a remote URL, passed through for the gateway to
/// download, or a local file sent inline.
fn garment_ref(garment: &str) -> Result<ImageRef, CliError> {
    if garment.starts_with("http://") || garment.starts_with("https://") {
        return Ok(ImageRef::new(garment));
    }
    Ok(read_image(Path::new(garment))?.to_image_ref())
}

fn write_image(path: &Path, image: &InlineImage) -> Result<(), CliError> {
    std::fs::write(path, image.data()).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn report(path: &Path, image: &InlineImage, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "output": path.display().to_string(),
            "mime_type": image.mime_type(),
            "bytes": image.data().len(),
        })),
        OutputFormat::Text => {
            if !quiet {
                println!(
                    "Wrote {} ({}, {} bytes)",
                    path.display(),
                    image.mime_type(),
                    image.data().len()
                );
                if image.file_extension() != extension_of(path) {
                    eprintln!(
                        "note: the generated image is {}; consider a .{} file name",
                        image.mime_type(),
                        image.file_extension()
                    );
                }
            }
        }
    }
}

fn extension_of(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}
