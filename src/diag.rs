//! Diagnostic CSV dumps.
//!
//! Semicolon-delimited, one header row then one row per sample or bin.
//! These files are written as a side effect when logging is enabled; the
//! pipeline never reads them back.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array1;

use crate::spectrum::SpectrumEstimate;

pub struct DiagnosticLogger {
    dir: PathBuf,
    bpm_file: BufWriter<File>,
    detailed_file: BufWriter<File>,
}

impl DiagnosticLogger {
    pub fn new(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;

        let mut bpm_file = BufWriter::new(File::create(dir.join("bpm.csv"))?);
        writeln!(bpm_file, "time;face_valid;mean;min;max")?;
        bpm_file.flush()?;

        let mut detailed_file = BufWriter::new(File::create(dir.join("bpm_detailed.csv"))?);
        writeln!(detailed_file, "time;face_valid;bpm")?;
        detailed_file.flush()?;

        Ok(Self {
            dir: dir.to_path_buf(),
            bpm_file,
            detailed_file,
        })
    }

    /// One row per emitted aggregate report.
    pub fn log_aggregate(
        &mut self,
        time: i64,
        face_valid: bool,
        mean: f64,
        min: f64,
        max: f64,
    ) -> std::io::Result<()> {
        writeln!(
            self.bpm_file,
            "{};{};{};{};{}",
            time, face_valid as u8, mean, min, max
        )?;
        self.bpm_file.flush()
    }

    /// One row per processed frame.
    pub fn log_instant(&mut self, time: i64, face_valid: bool, bpm: f64) -> std::io::Result<()> {
        writeln!(self.detailed_file, "{};{};{}", time, face_valid as u8, bpm)?;
        self.detailed_file.flush()
    }

    /// Raw and filtered values of the current window, one file per frame.
    pub fn dump_signal(
        &mut self,
        time: i64,
        raw_green: &Array1<f32>,
        waveform: &Array1<f32>,
    ) -> std::io::Result<()> {
        let mut file = BufWriter::new(File::create(
            self.dir.join(format!("signal_{}.csv", time)),
        )?);
        writeln!(file, "g;signal")?;
        for (g, s) in raw_green.iter().zip(waveform.iter()) {
            writeln!(file, "{};{}", g, s)?;
        }
        file.flush()
    }

    /// In-band power spectrum bins, one file per frame.
    pub fn dump_spectrum(&mut self, time: i64, spectrum: &SpectrumEstimate) -> std::io::Result<()> {
        let mut file = BufWriter::new(File::create(
            self.dir.join(format!("estimation_{}.csv", time)),
        )?);
        writeln!(file, "i;power")?;
        for i in spectrum.low_bin..=spectrum.high_bin {
            writeln!(file, "{};{}", i, spectrum.power[i])?;
        }
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_headers_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = DiagnosticLogger::new(dir.path()).unwrap();
        logger.log_instant(100, true, 62.5).unwrap();
        logger.log_aggregate(200, true, 61.25, 58.0, 65.0).unwrap();

        let detailed = std::fs::read_to_string(dir.path().join("bpm_detailed.csv")).unwrap();
        assert!(detailed.starts_with("time;face_valid;bpm\n"));
        assert!(detailed.contains("100;1;62.5"));

        let bpm = std::fs::read_to_string(dir.path().join("bpm.csv")).unwrap();
        assert!(bpm.contains("200;1;61.25;58;65"));
    }

    #[test]
    fn test_signal_dump() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = DiagnosticLogger::new(dir.path()).unwrap();
        let raw = Array1::from(vec![100.0f32, 101.0]);
        let wave = Array1::from(vec![0.5f32, -0.5]);
        logger.dump_signal(42, &raw, &wave).unwrap();

        let text = std::fs::read_to_string(dir.path().join("signal_42.csv")).unwrap();
        assert!(text.starts_with("g;signal\n"));
        assert!(text.contains("100;0.5"));
    }
}
