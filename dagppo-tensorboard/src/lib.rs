//! [`Recorder`] writing training metrics to TFRecord files for TensorBoard.
use dagppo_core::record::{Record, RecordValue, Recorder, STEP_KEY};
use log::warn;
use std::path::Path;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Write records to TFRecord.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
    step_key: String,
}

impl TensorboardRecorder {
    /// Construct a [`TensorboardRecorder`].
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
            step_key: STEP_KEY.to_string(),
        }
    }

    /// Step of a record, `None` if the record has no step counter.
    fn step(&self, record: &Record) -> Option<usize> {
        match record.get(&self.step_key) {
            Some(RecordValue::Step(v)) => Some(*v),
            _ => None,
        }
    }
}

impl Recorder for TensorboardRecorder {
    /// Write a given [`Record`] into a TFRecord.
    ///
    /// This method handles [`RecordValue::Scalar`] and [`RecordValue::Scalars`].
    /// Other values are skipped with a warning, as is a record without the
    /// step counter.
    fn write(&mut self, record: Record) {
        let step = match self.step(&record) {
            Some(step) => step,
            None => {
                warn!("Record without {} is skipped", self.step_key);
                return;
            }
        };

        for (k, v) in record.iter() {
            if *k != self.step_key {
                match v {
                    RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step),
                    RecordValue::Scalars(map) => self.writer.add_scalars(k, map, step),
                    _ => warn!("Unsupported value: {:?}", (k, v)),
                };
            }
        }
    }

    fn flush(&mut self) {
        self.writer.flush();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{collections::HashMap, fs};
    use tempdir::TempDir;

    #[test]
    fn test_write_records() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("tensorboard")?;
        let mut recorder = TensorboardRecorder::new(dir.path());

        let mut record = Record::from_scalar("critic_mse/train", 0.5);
        record.insert(STEP_KEY, RecordValue::Step(2000));
        record.insert(
            "ratio/test",
            RecordValue::Scalars(HashMap::from([("mean".to_string(), 1.2)])),
        );
        recorder.write(record);
        recorder.write(Record::from_scalar("reward/train", 1.0));
        recorder.flush();

        assert!(fs::read_dir(dir.path())?.next().is_some());
        Ok(())
    }

    #[test]
    fn test_step_is_read_exactly() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("tensorboard")?;
        let recorder = TensorboardRecorder::new(dir.path());
        // 2^24 + 1, not representable in f32
        let record = Record::from_slice(&[(STEP_KEY, RecordValue::Step(16_777_217))]);

        assert_eq!(recorder.step(&record), Some(16_777_217));
        // A step stored as a scalar is not a step counter
        assert_eq!(recorder.step(&Record::from_scalar(STEP_KEY, 2.0)), None);
        Ok(())
    }
}
