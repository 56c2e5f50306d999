//! Image upload.

use std::path::PathBuf;

use anyhow::Result;
use vitrine_core::api::UploadFile;

use crate::cli::App;

pub async fn run(app: &App, files: &[PathBuf]) -> Result<()> {
    let uploads = files
        .iter()
        .map(|path| UploadFile::from_path(path))
        .collect::<Result<Vec<_>>>()?;

    app.require_session().await?;
    let urls = app.client().upload_images(uploads).await?;
    for url in urls {
        println!("{url}");
    }
    Ok(())
}
