// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch pipeline orchestrator — the two engine operations the routing layer
// invokes: batch conversion and layout merging.
//
// Inputs within one batch are processed sequentially. That bounds peak
// memory to one decoded image plus one open archive per request; concurrent
// client requests each run their own pipeline over their own state.

use std::sync::Arc;

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::types::{
    BatchId, BatchOutput, ConversionOptions, MergeOptions, MergeResult, ProcessedResult,
};
use bildwerk_media::{
    ImageCodec, carry_exif, compress_to_target, encoder_available, export_single_page_pdf,
    merge_images, render_watermark,
};
use tracing::{debug, info, instrument, warn};

use crate::archive::BatchArchive;
use crate::naming::{NameGenerator, UuidNames};
use crate::store::{OutputStore, UploadStore};

/// Orchestrates conversion and merge requests over the file stores.
pub struct BatchPipeline {
    uploads: UploadStore,
    outputs: OutputStore,
    names: Arc<dyn NameGenerator>,
}

impl BatchPipeline {
    pub fn new(uploads: UploadStore, outputs: OutputStore, names: Arc<dyn NameGenerator>) -> Self {
        Self {
            uploads,
            outputs,
            names,
        }
    }

    /// Build a pipeline from service configuration with production naming.
    pub fn from_config(config: &bildwerk_core::ServiceConfig) -> Self {
        Self::new(
            UploadStore::new(config.uploads_dir.clone()),
            OutputStore::new(config.output_dir.clone(), config.output_prefix.clone()),
            Arc::new(UuidNames),
        )
    }

    // -- Batch conversion -----------------------------------------------------

    /// Convert every resolvable input and package the outputs into one
    /// archive.
    ///
    /// Missing or undecodable inputs are skipped and the batch continues;
    /// results preserve input order. Storage and archive failures abort the
    /// request — a half-written archive is never reported as success.
    #[instrument(skip(self, file_ids, options), fields(inputs = file_ids.len()))]
    pub async fn process(
        &self,
        file_ids: &[String],
        options: &ConversionOptions,
    ) -> Result<BatchOutput> {
        options.validate()?;
        ensure_encoder(options)?;

        let batch_id = BatchId::new();
        let archive_name = format!("batch-{}.zip", self.names.unique_stem());
        let mut archive = BatchArchive::create(self.outputs.root(), archive_name)?;
        let mut results = Vec::with_capacity(file_ids.len());

        for file_id in file_ids {
            match self.process_one(file_id, options, &mut archive).await {
                Ok(Some(result)) => results.push(result),
                // Unresolvable input: skipped silently by contract.
                Ok(None) => {}
                // Unreadable or undecodable input: local failure, batch
                // continues with the remaining inputs.
                Err(err @ (BildwerkError::Decode(_) | BildwerkError::Io(_))) => {
                    warn!(%file_id, %err, "input skipped");
                }
                Err(fatal) => return Err(fatal),
            }
        }

        let filename = archive.seal()?;
        let archive_url = self.outputs.url_of(&filename);
        info!(
            batch = %batch_id,
            produced = results.len(),
            archive = %archive_url,
            "Batch complete"
        );

        Ok(BatchOutput {
            batch_id,
            results,
            archive_url,
        })
    }

    /// Convert a single input: watermark, encode (size-targeted when asked),
    /// metadata policy, persist, and append to the archive.
    async fn process_one(
        &self,
        file_id: &str,
        options: &ConversionOptions,
        archive: &mut BatchArchive,
    ) -> Result<Option<ProcessedResult>> {
        let Some(path) = self.uploads.resolve(file_id).await else {
            debug!(file_id, "input missing, skipped");
            return Ok(None);
        };
        let (source, original_size) = self.uploads.read(&path).await?;

        let mut codec = ImageCodec::from_bytes(&source)?;

        if let Some(text) = &options.watermark_text {
            let layer = render_watermark(
                text,
                options.watermark_opacity,
                codec.width(),
                codec.height(),
            )?;
            codec = codec.composite(&[layer]);
        }

        let (width, height) = (codec.width(), codec.height());

        let encoded = match options.target_size_kb {
            Some(kb) => {
                compress_to_target(&codec, options.format, u64::from(kb) * 1024)?.bytes
            }
            None => codec.encode(options.format, options.quality)?,
        };

        let encoded = if options.keep_metadata {
            carry_exif(&source, encoded, options.format)
        } else {
            encoded
        };

        let filename = format!(
            "processed-{}.{}",
            source_stem(file_id),
            options.format.extension()
        );
        let url = self.outputs.persist(&filename, &encoded).await?;
        archive.add_entry(&filename, &encoded)?;

        Ok(Some(ProcessedResult {
            source_id: file_id.to_string(),
            url,
            filename,
            original_size,
            new_size: encoded.len() as u64,
            format: options.format,
            width,
            height,
        }))
    }

    // -- Merge ----------------------------------------------------------------

    /// Composite the inputs onto one canvas and persist the result, with a
    /// best-effort PDF rendition.
    ///
    /// Inputs that fail to resolve, read, or decode are excluded; fewer than
    /// two survivors fail the whole request with `InsufficientInputs` and
    /// nothing is persisted.
    #[instrument(skip(self, file_ids, options), fields(inputs = file_ids.len()))]
    pub async fn merge(
        &self,
        file_ids: &[String],
        options: &MergeOptions,
    ) -> Result<MergeResult> {
        options.validate()?;
        if !encoder_available(options.format) {
            return Err(BildwerkError::UnsupportedFormat(format!(
                "no encoder available for {}",
                options.format.extension()
            )));
        }

        let mut images = Vec::with_capacity(file_ids.len());
        let mut combined_original_size = 0u64;

        for file_id in file_ids {
            let Some(path) = self.uploads.resolve(file_id).await else {
                warn!(%file_id, "merge input missing, excluded");
                continue;
            };
            let (bytes, size) = match self.uploads.read(&path).await {
                Ok(read) => read,
                Err(err) => {
                    warn!(%file_id, %err, "merge input unreadable, excluded");
                    continue;
                }
            };
            match ImageCodec::from_bytes(&bytes) {
                Ok(codec) => {
                    combined_original_size += size;
                    images.push(codec);
                }
                Err(err) => warn!(%file_id, %err, "merge input undecodable, excluded"),
            }
        }

        // Fails with InsufficientInputs when fewer than two survived.
        let merged = merge_images(&images, options)?;

        // Final dimensions come from decoding the encoded output, which also
        // guards against encoders that altered the canvas.
        let decoded = ImageCodec::from_bytes(&merged.bytes)?;
        let (width, height) = (decoded.width(), decoded.height());

        let stem = self.names.unique_stem();
        let filename = format!("merged-{stem}.{}", options.format.extension());
        let url = self.outputs.persist(&filename, &merged.bytes).await?;

        // PDF export is best-effort: a failure is logged and the merge
        // result is returned without the PDF reference.
        let (pdf_url, pdf_filename) = match export_single_page_pdf(&merged.bytes) {
            Ok(pdf_bytes) => {
                let pdf_name = format!("merged-{stem}.pdf");
                match self.outputs.persist(&pdf_name, &pdf_bytes).await {
                    Ok(pdf_url) => (Some(pdf_url), Some(pdf_name)),
                    Err(err) => {
                        warn!(%err, "PDF persist failed, returning merge without PDF");
                        (None, None)
                    }
                }
            }
            Err(err) => {
                warn!(%err, "PDF export failed, returning merge without PDF");
                (None, None)
            }
        };

        info!(width, height, size = merged.bytes.len(), "Merge complete");

        Ok(MergeResult {
            url,
            filename,
            combined_original_size,
            new_size: merged.bytes.len() as u64,
            width,
            height,
            pdf_url,
            pdf_filename,
        })
    }
}

/// Ensure the conversion target format has an encoder before any pixel work.
fn ensure_encoder(options: &ConversionOptions) -> Result<()> {
    if !encoder_available(options.format) {
        return Err(BildwerkError::UnsupportedFormat(format!(
            "no encoder available for {}",
            options.format.extension()
        )));
    }
    Ok(())
}

/// Original filename stem an output name is derived from.
fn source_stem(file_id: &str) -> &str {
    file_id
        .rfind('.')
        .map(|dot| &file_id[..dot])
        .unwrap_or(file_id)
}
