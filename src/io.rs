//! Safetensors I/O for the `exg-ransac` binary.
//!
//! Reader: `epochs.safetensors` with keys
//!
//! ```text
//! data       [E, C, T] or [C, T]   F32 | F64   ([C, T] is cut into epochs)
//! chan_pos   [C, 3]                F32 | F64   metres
//! ch_names   bytes                 U8          newline-separated
//! ch_types   bytes (optional)      U8          newline-separated, default eeg
//! sfreq      [1] (optional)        F32 | F64
//! ```
//!
//! Writer: [`StWriter`] for result tensors, [`write_report`] for the JSON
//! summary.
use anyhow::{bail, Context, Result};
use ndarray::{Array2, Array3};
use std::collections::HashMap;
use std::path::Path;

use crate::config::RansacConfig;
use crate::epoch::Epochs;
use crate::info::{ChannelInfo, ChannelKind, Info};
use crate::ransac::FittedRansac;

// ── Low-level safetensors parser ────────────────────────────────────────────

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, serde_json::Value>, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let n = u64::from_le_bytes(bytes[..8].try_into()?);
    let end = usize::try_from(n)
        .ok()
        .and_then(|n| n.checked_add(8))
        .filter(|&end| end <= bytes.len())
        .with_context(|| format!("safetensors header length {n} exceeds file size {}", bytes.len()))?;
    let header: HashMap<String, serde_json::Value> =
        serde_json::from_slice(&bytes[8..end])
            .context("failed to parse safetensors header")?;
    Ok((header, end))
}

fn tensor_bytes<'a>(bytes: &'a [u8], data_start: usize, entry: &serde_json::Value) -> Result<&'a [u8]> {
    let offsets = entry["data_offsets"]
        .as_array()
        .context("missing data_offsets")?;
    let offset = |i: usize| {
        offsets
            .get(i)
            .and_then(|v| v.as_u64())
            .and_then(|v| usize::try_from(v).ok())
            .and_then(|v| data_start.checked_add(v))
            .context("bad data_offsets")
    };
    let (s, e) = (offset(0)?, offset(1)?);
    bytes.get(s..e).context("tensor data out of bounds")
}

fn read_f64_tensor(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<f64>> {
    let raw = tensor_bytes(bytes, data_start, entry)?;
    match entry["dtype"].as_str() {
        Some("F32") => Ok(raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect()),
        Some("F64") => Ok(raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect()),
        other => bail!("unsupported dtype {other:?}, expected F32 or F64"),
    }
}

fn read_lines(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<String>> {
    let raw_str = std::str::from_utf8(tensor_bytes(bytes, data_start, entry)?)?;
    Ok(raw_str
        .split('\n')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("missing shape")?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("bad shape entry"))
        .collect()
}

// ── Reader ────────────────────────────────────────────────────────────────────

/// Load epochs from a safetensors file.
///
/// A 2-D `data` tensor is a continuous recording and needs `epoch_samples`.
pub fn load_epochs(path: &Path, epoch_samples: Option<usize>) -> Result<Epochs> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let (header, data_start) = parse_header(&bytes)?;

    let pos_entry = header.get("chan_pos").context("missing 'chan_pos' key")?;
    let pos_shape = shape_of(pos_entry)?;
    if pos_shape.len() != 2 || pos_shape[1] != 3 {
        bail!("chan_pos must be [C, 3], got {pos_shape:?}");
    }
    let pos = Array2::from_shape_vec(
        (pos_shape[0], 3),
        read_f64_tensor(&bytes, data_start, pos_entry)?,
    )?;

    let names_entry = header.get("ch_names").context("missing 'ch_names' key")?;
    let ch_names = read_lines(&bytes, data_start, names_entry)?;
    if ch_names.len() != pos.nrows() {
        bail!("{} channel names for {} positions", ch_names.len(), pos.nrows());
    }

    let ch_kinds: Vec<ChannelKind> = match header.get("ch_types") {
        Some(e) => read_lines(&bytes, data_start, e)?
            .iter()
            // Unknown names become `ChannelKind::Other` and fail the fit.
            .map(|s| match s.parse::<ChannelKind>() {
                Ok(kind) => kind,
                Err(never) => match never {},
            })
            .collect(),
        None => vec![ChannelKind::Eeg; ch_names.len()],
    };
    if ch_kinds.len() != ch_names.len() {
        bail!("{} channel types for {} channels", ch_kinds.len(), ch_names.len());
    }

    let sfreq = match header.get("sfreq") {
        Some(e) => *read_f64_tensor(&bytes, data_start, e)?
            .first()
            .context("empty 'sfreq'")?,
        None => 0.0,
    };

    let chs = ch_names
        .into_iter()
        .zip(ch_kinds)
        .zip(pos.rows())
        .map(|((name, kind), p)| ChannelInfo::new(name, kind, [p[0], p[1], p[2]]))
        .collect();
    let info = Info::new(chs, sfreq);

    let data_entry = header.get("data").context("missing 'data' key")?;
    let data_shape = shape_of(data_entry)?;
    let data_vec = read_f64_tensor(&bytes, data_start, data_entry)?;
    let epochs = match data_shape[..] {
        [e, c, t] => Epochs::new(Array3::from_shape_vec((e, c, t), data_vec)?, info)?,
        [c, t] => {
            let n = epoch_samples.context("continuous [C, T] data needs epoch_samples")?;
            let continuous = Array2::from_shape_vec((c, t), data_vec)?;
            Epochs::from_continuous(&continuous, n, info)?
        }
        _ => bail!("data must be [E, C, T] or [C, T], got {data_shape:?}"),
    };
    Ok(epochs)
}

// ── Generic safetensors builder ───────────────────────────────────────────────

/// Simple safetensors file writer that handles F32, F64, I32 and U8 tensors.
///
/// Usage:
/// ```rust,no_run
/// use exg_ransac::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("corr", &[0.9, 0.1], &[1, 2]);
/// w.add_lines("ch_names", &["Fz".to_string(), "Cz".to_string()]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I32", shape.to_vec()));
    }

    /// Newline-joined strings stored as a U8 tensor.
    pub fn add_lines(&mut self, name: &str, lines: &[String]) {
        let bytes = lines.join("\n").into_bytes();
        let len = bytes.len();
        self.entries.push((name.to_string(), bytes, "U8", vec![len]));
    }

    pub fn add_f64_arr2(&mut self, name: &str, arr: &Array2<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_f64_arr3(&mut self, name: &str, arr: &Array3<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, arr.shape());
    }

    /// Write an [`Epochs`] in the layout [`load_epochs`] reads.
    pub fn add_epochs(&mut self, epochs: &Epochs) {
        self.add_f64_arr3("data", epochs.data());
        let pos: Vec<f64> = epochs.info.chs.iter().flat_map(|c| c.loc).collect();
        self.add_f64("chan_pos", &pos, &[epochs.n_channels(), 3]);
        let names: Vec<String> = epochs.info.chs.iter().map(|c| c.name.clone()).collect();
        self.add_lines("ch_names", &names);
        let kinds: Vec<String> = epochs.info.chs.iter().map(|c| c.kind.to_string()).collect();
        self.add_lines("ch_types", &kinds);
        self.add_f64("sfreq", &[epochs.info.sfreq], &[1]);
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes.into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();
        let mut f = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Write `corr` [E, C] F64, `bad_log` [E, C] I32 and, if given, the repaired
/// epochs.
pub fn write_results(path: &Path, fitted: &FittedRansac, repaired: Option<&Epochs>) -> Result<()> {
    let mut w = StWriter::new();
    w.add_f64_arr2("corr", &fitted.corr);
    let log: Vec<i32> = fitted.bad_log.iter().map(|&b| b as i32).collect();
    w.add_i32("bad_log", &log, &[fitted.bad_log.nrows(), fitted.bad_log.ncols()]);
    w.add_lines("bad_chs", &fitted.bad_chs);
    if let Some(epochs) = repaired {
        w.add_epochs(epochs);
    }
    w.write(path)
}

/// JSON summary of one fit.
pub fn report_json(config: &RansacConfig, fitted: &FittedRansac, ch_names: &[&str]) -> serde_json::Value {
    let n_epochs = fitted.corr.nrows();
    let tally = crate::aggregate::bad_tally(&fitted.bad_log);
    let per_channel: Vec<serde_json::Value> = ch_names
        .iter()
        .zip(tally.iter())
        .map(|(name, &n)| {
            serde_json::json!({
                "name": name,
                "bad_epochs": n,
                "bad_fraction": n as f64 / n_epochs as f64,
            })
        })
        .collect();
    serde_json::json!({
        "config": {
            "n_resample": config.n_resample,
            "min_channels": config.min_channels,
            "min_corr": config.min_corr,
            "unbroken_time": config.unbroken_time,
            "n_jobs": config.n_jobs,
            "random_state": config.random_state,
        },
        "n_epochs": n_epochs,
        "sensor_family": format!("{:?}", fitted.family).to_lowercase(),
        "bad_chs": fitted.bad_chs,
        "channels": per_channel,
    })
}

pub fn write_report(path: &Path, config: &RansacConfig, fitted: &FittedRansac, ch_names: &[&str]) -> Result<()> {
    let json = serde_json::to_string_pretty(&report_json(config, fitted, ch_names))?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}
