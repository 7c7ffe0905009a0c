//! Images command - list container images in rendered manifests

use chartscope_core::extract_images;
use std::io::Read;
use std::path::Path;

use crate::error::{CliError, Result};

/// Read manifests from `input` (stdin for `-` or none) and print their images
pub fn run(input: Option<&Path>, json: bool) -> Result<()> {
    let rendered = read_input(input)?;
    let images = extract_images(&rendered);

    if json {
        println!("{}", serde_json::to_string_pretty(&images)?);
    } else {
        for image in &images {
            println!("{}", image);
        }
    }
    Ok(())
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => {
            std::fs::read_to_string(path).map_err(|e| CliError::Io {
                message: format!("{}: {}", path.display(), e),
            })
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
