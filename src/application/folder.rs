use crate::domain::files::{CsvInputFile, Folder};
use crate::error::PipelineError;
use crate::infrastructure::blocking::BlockingPool;
use crate::interfaces::csv::folder::{list_csv_files, provision_output};
use crate::pipeline::step::{DomainStream, OneToMany};
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

/// Enumerates a folder's input files and provisions an output file for each.
///
/// The output file is created right before its pair is emitted, so nothing
/// downstream ever sees an input without a writable companion.
pub struct ProcessFolderStep {
    pool: BlockingPool,
}

impl ProcessFolderStep {
    pub fn new(pool: BlockingPool) -> Self {
        Self { pool }
    }
}

impl OneToMany<Folder, CsvInputFile> for ProcessFolderStep {
    fn apply(&self, folder: Folder) -> DomainStream<CsvInputFile> {
        let listing_pool = self.pool.clone();
        let pool = self.pool.clone();
        let root = folder.path().to_path_buf();

        let listing = stream::once(async move {
            let dir = root.clone();
            let files = listing_pool.run(move || list_csv_files(&dir)).await;
            (root, files)
        });

        listing
            .flat_map(|(root, files)| match files {
                Ok(files) => {
                    info!(folder = %root.display(), files = files.len(), "listed input files");
                    stream::iter(files.into_iter().map(move |input| {
                        Ok::<_, PipelineError>(CsvInputFile::new(root.clone(), input))
                    }))
                    .boxed()
                }
                Err(e) => stream::iter([Err(e)]).boxed(),
            })
            .then(move |file| {
                let pool = pool.clone();
                async move {
                    let file = file?;
                    let output = file.output().to_path_buf();
                    pool.run(move || provision_output(&output)).await?;
                    debug!(
                        input = %file.input().display(),
                        output = %file.output().display(),
                        "provisioned output file"
                    );
                    Ok::<_, PipelineError>(file)
                }
            })
            .boxed()
    }
}
