use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD};

use super::read_file;
use crate::{error::CliResult, server::DiagnosisRequest};

pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Prints the base64 payload for `image_path`, optionally wrapped in the
/// request body the diagnosis endpoints accept.
pub fn handle_encode(
    image_path: &Path,
    request: bool,
) -> CliResult<()> {
    let image = encode_image(&read_file(image_path)?);
    if request {
        println!(
            "{}",
            serde_json::to_string(&DiagnosisRequest {
                image,
            })?
        );
    } else {
        println!("{image}");
    }
    Ok(())
}
