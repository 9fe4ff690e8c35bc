pub mod featurize;
pub mod score;

use crate::error::{CliError, Result};
use dockrank::core::io::StructureFormat;
use dockrank::core::io::stream::MoleculeStream;
use dockrank::core::models::record::MoleculeRole;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Opens a structure file as a record stream, inferring the format from the
/// extension unless one is given.
pub(crate) fn open_structures(
    path: &Path,
    format: Option<StructureFormat>,
    role: MoleculeRole,
) -> Result<MoleculeStream<BufReader<File>>> {
    let format = match format.or_else(|| StructureFormat::from_path(path)) {
        Some(format) => format,
        None => {
            return Err(CliError::Argument(format!(
                "Cannot infer the {} format of '{}'; pass it explicitly",
                role,
                path.display()
            )));
        }
    };
    info!("Reading {} structures ({}) from {:?}", role, format, path);
    MoleculeStream::open(path, format, role).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

/// Output sink: the given file, or stdout.
pub(crate) fn create_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            info!("Writing output to {:?}", path);
            Box::new(BufWriter::new(File::create(path)?))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}


#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const ATOM_FLAGS: &str = "0  0  0  0  0  0  0  0  0  0  0  0";

    fn sdf_block(title: &str, atoms: &[(&str, f64)]) -> String {
        let mut block = format!(
            "{}\n  fixture\n\n{:>3}  0  0  0  0  0  0  0  0  0999 V2000\n",
            title,
            atoms.len()
        );
        for (element, x) in atoms {
            block.push_str(&format!(
                "{:>10.4}{:>10.4}{:>10.4} {:<3} {}\n",
                x, 0.0, 0.0, element, ATOM_FLAGS
            ));
        }
        block.push_str("M  END\n$$$$\n");
        block
    }

    /// Receptor C at x=0 and N at x=5; two oxygen poses near each of them and a
    /// malformed record between them.
    pub(crate) fn write_inputs(dir: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
        let receptor = dir.path().join("receptor.sdf");
        fs::write(&receptor, sdf_block("receptor", &[("C", 0.0), ("N", 5.0)])).unwrap();

        let poses = dir.path().join("poses.sdf");
        let content = [
            sdf_block("near-carbon", &[("O", 0.5)]),
            "broken\n  fixture\n\nnot a counts line\nM  END\n$$$$\n".to_string(),
            sdf_block("near-nitrogen", &[("O", 4.8)]),
        ]
        .concat();
        fs::write(&poses, content).unwrap();

        // Fields are ordered receptor type, ligand type, bin: C-O is 2, N-O is 5.
        let model = dir.path().join("model.json");
        fs::write(
            &model,
            r#"{
                "schema": { "vocabulary": ["C", "N", "O"], "bin_edges": [0, 4], "cutoff": 4 },
                "model": { "kind": "linear", "weights": [0, 0, 1, 0, 0, 3, 0, 0, 0] }
            }"#,
        )
        .unwrap();

        (receptor, poses, model)
    }
}
