//! Hands the current document to the user as a `.3dm` file.

use crate::document::{GeometryDocument, archive_file_name};

/// Serialize `doc` and offer it under a name derived from `definition`.
pub fn offer_document(doc: &GeometryDocument, definition: &str) -> anyhow::Result<()> {
    let bytes = doc.to_bytes()?;
    let file_name = archive_file_name(definition);
    log::info!("offering {file_name} ({} bytes, {} objects)", bytes.len(), doc.len());
    save_bytes(bytes, file_name)
}

/// Blob + hidden anchor click.
#[cfg(target_arch = "wasm32")]
fn save_bytes(bytes: Vec<u8>, file_name: String) -> anyhow::Result<()> {
    use wasm_bindgen::JsCast;

    let js = |e: wasm_bindgen::JsValue| anyhow::anyhow!("{e:?}");
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| anyhow::anyhow!("no document in this context"))?;

    let array = js_sys::Uint8Array::from(bytes.as_slice());
    let parts = js_sys::Array::new();
    parts.push(&array.buffer());
    let props = web_sys::BlobPropertyBag::new();
    props.set_type("application/octet-stream");
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &props).map_err(js)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob).map_err(js)?;

    let anchor = document
        .create_element("a")
        .map_err(js)?
        .dyn_into::<web_sys::HtmlAnchorElement>()
        .map_err(|_| anyhow::anyhow!("<a> is not an anchor element"))?;
    anchor.set_href(&url);
    anchor.set_download(&file_name);
    anchor.click();
    web_sys::Url::revoke_object_url(&url).map_err(js)?;
    Ok(())
}

/// Native save dialog; runs off the UI thread.
#[cfg(not(target_arch = "wasm32"))]
fn save_bytes(bytes: Vec<u8>, file_name: String) -> anyhow::Result<()> {
    crate::execute(async move {
        let Some(handle) = rfd::AsyncFileDialog::new()
            .add_filter("Rhino 3D model", &["3dm"])
            .set_file_name(&file_name)
            .save_file()
            .await
        else {
            log::info!("download of {file_name} cancelled");
            return;
        };
        match std::fs::write(handle.path(), &bytes) {
            Ok(()) => log::info!("wrote {}", handle.path().display()),
            Err(e) => log::error!("could not write {}: {e}", handle.path().display()),
        }
    });
    Ok(())
}
