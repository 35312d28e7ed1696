use std::path::{Path, PathBuf};

use csv_async::{AsyncSerializer, AsyncWriterBuilder};
use serde::Serialize;
use tokio::fs::{self, File};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use super::error::IoError;
use super::extract::{partial_path, remove_artifact};
use super::rows::{EntityRow, ModuleRow, OUTPUT_DELIMITER, OutputKind, SummaryRow};
use crate::domain::Route;

/// Append-only delimited stream that only appears under its final name
/// once closed
pub struct DelimitedWriter {
    serializer: AsyncSerializer<Compat<File>>,
    partial: PathBuf,
    target: PathBuf,
    rows: u64,
}

impl DelimitedWriter {
    /// Create the stream at `<target>.partial`
    pub async fn create(target: impl AsRef<Path>) -> Result<Self, IoError> {
        let target = target.as_ref().to_path_buf();
        let partial = partial_path(&target);
        let file = File::create(&partial).await?;

        let serializer = AsyncWriterBuilder::new()
            .delimiter(OUTPUT_DELIMITER)
            .has_headers(false)
            .create_serializer(file.compat_write());

        Ok(Self {
            serializer,
            partial,
            target,
            rows: 0,
        })
    }

    pub async fn write<R: Serialize>(&mut self, row: &R) -> Result<(), IoError> {
        self.serializer.serialize(row).await?;
        self.rows += 1;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), IoError> {
        self.serializer.flush().await?;
        Ok(())
    }

    /// Flush and move the stream to its final name
    pub async fn close(mut self) -> Result<PathBuf, IoError> {
        self.serializer.flush().await?;
        drop(self.serializer);
        fs::rename(&self.partial, &self.target).await?;
        debug!(path = %self.target.display(), rows = self.rows, "Closed output stream");
        Ok(self.target)
    }
}

/// The three streams of one output family
pub struct FamilyWriters {
    entity: DelimitedWriter,
    summary: DelimitedWriter,
    module: DelimitedWriter,
}

impl FamilyWriters {
    async fn create(dir: &Path, area: &str, route: Route) -> Result<Self, IoError> {
        Ok(Self {
            entity: DelimitedWriter::create(dir.join(OutputKind::Entity.file_name(area, route)))
                .await?,
            summary: DelimitedWriter::create(dir.join(OutputKind::Summary.file_name(area, route)))
                .await?,
            module: DelimitedWriter::create(dir.join(OutputKind::Module.file_name(area, route)))
                .await?,
        })
    }

    async fn flush(&mut self) -> Result<(), IoError> {
        self.entity.flush().await?;
        self.summary.flush().await?;
        self.module.flush().await
    }

    async fn close(self) -> Result<Vec<PathBuf>, IoError> {
        Ok(vec![
            self.entity.close().await?,
            self.summary.close().await?,
            self.module.close().await?,
        ])
    }
}

/// Output streams of one area, opened per family on first use
pub struct AreaOutputs {
    dir: PathBuf,
    area: String,
    families: [Option<FamilyWriters>; 2],
}

impl AreaOutputs {
    pub fn new(dir: impl Into<PathBuf>, area: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            area: area.into(),
            families: [None, None],
        }
    }

    async fn family(&mut self, route: Route) -> Result<&mut FamilyWriters, IoError> {
        let slot = &mut self.families[route.index()];
        if slot.is_none() {
            debug!(area = %self.area, %route, "Opening output family");
            *slot = Some(FamilyWriters::create(&self.dir, &self.area, route).await?);
        }
        // populated just above
        slot.as_mut().ok_or_else(|| {
            IoError::Io(std::io::Error::other("output family not opened"))
        })
    }

    pub async fn write_entity(&mut self, route: Route, row: &EntityRow) -> Result<(), IoError> {
        self.family(route).await?.entity.write(row).await
    }

    pub async fn write_summary(&mut self, route: Route, row: &SummaryRow) -> Result<(), IoError> {
        self.family(route).await?.summary.write(row).await
    }

    pub async fn write_module(&mut self, route: Route, row: &ModuleRow) -> Result<(), IoError> {
        self.family(route).await?.module.write(row).await
    }

    /// Flush every open stream
    pub async fn flush(&mut self) -> Result<(), IoError> {
        for family in self.families.iter_mut().flatten() {
            family.flush().await?;
        }
        Ok(())
    }

    /// Close every open stream, returning the finished paths
    pub async fn close(self) -> Result<Vec<PathBuf>, IoError> {
        let mut paths = Vec::new();
        for family in self.families.into_iter().flatten() {
            paths.extend(family.close().await?);
        }
        Ok(paths)
    }
}

/// Remove finished and partial outputs an earlier run left for an area
pub async fn remove_outputs(dir: &Path, area: &str) -> Result<usize, IoError> {
    let mut removed = 0;
    for route in Route::ALL {
        for kind in OutputKind::ALL {
            removed += remove_artifact(&dir.join(kind.file_name(area, route))).await?;
        }
    }
    if removed > 0 {
        debug!(area, removed, "Removed previous outputs");
    }
    Ok(removed)
}
