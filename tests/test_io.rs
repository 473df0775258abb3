mod common;
use common::Synthetic;
use exg_ransac::io::{load_epochs, write_report, write_results, StWriter};
use exg_ransac::{ChannelKind, Ransac, RansacConfig};
use std::path::PathBuf;

fn tmp(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("exg_ransac_{}_{name}", std::process::id()))
}

#[test]
fn written_epochs_load_back() {
    let epochs = Synthetic { dead: vec![1], ..Default::default() }.epochs();
    let path = tmp("epochs.safetensors");
    let mut w = StWriter::new();
    w.add_epochs(&epochs);
    w.write(&path).unwrap();

    let loaded = load_epochs(&path, None).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded, epochs);
}

#[test]
fn continuous_f32_data_is_epoched() {
    let path = tmp("continuous.safetensors");
    let (n_ch, n_t) = (3, 23);
    let data: Vec<f32> = (0..n_ch * n_t).map(|i| i as f32).collect();
    let mut w = StWriter::new();
    w.add_f32("data", &data, &[n_ch, n_t]);
    w.add_f32("chan_pos", &[0.0, 0.0, 0.1, 0.1, 0.0, 0.0, 0.0, 0.1, 0.0], &[n_ch, 3]);
    w.add_lines("ch_names", &["Fz".to_string(), "C3".to_string(), "C4".to_string()]);
    w.add_lines("ch_types", &["eeg".to_string(), "EEG".to_string(), "eog".to_string()]);
    w.write(&path).unwrap();

    let loaded = load_epochs(&path, Some(5)).unwrap();
    assert!(load_epochs(&path, None).is_err());
    std::fs::remove_file(&path).ok();

    assert_eq!((loaded.n_epochs(), loaded.n_channels(), loaded.n_times()), (4, 3, 5));
    assert_eq!(loaded.data()[[1, 2, 0]], (2 * n_t + 5) as f64);
    assert_eq!(loaded.info.chs[1].kind, ChannelKind::Eeg);
    assert_eq!(loaded.info.chs[2].kind, ChannelKind::Other("eog".into()));
    assert_eq!(loaded.info.sfreq, 0.0);
}

#[test]
fn report_and_results_are_written() {
    let epochs = Synthetic { dead: vec![8], ..Default::default() }.epochs();
    let cfg = RansacConfig::default();
    let mut ransac = Ransac::new(cfg.clone());
    let cleaned = ransac.fit_transform(&epochs).unwrap();
    let fitted = ransac.fitted().unwrap();

    let report = tmp("report.json");
    write_report(&report, &cfg, fitted, &epochs.info.ch_names()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    std::fs::remove_file(&report).ok();
    assert_eq!(json["bad_chs"], serde_json::json!(["EEG008"]));
    assert_eq!(json["channels"][8]["bad_epochs"], 20);
    assert_eq!(json["sensor_family"], "eeg");
    assert_eq!(json["config"]["n_resample"], 50);

    let results = tmp("results.safetensors");
    write_results(&results, fitted, Some(&cleaned)).unwrap();
    let reloaded = load_epochs(&results, None).unwrap();
    std::fs::remove_file(&results).ok();
    assert_eq!(reloaded.data(), cleaned.data());
}

#[test]
fn malformed_headers_are_errors() {
    let path = tmp("malformed.safetensors");

    // header length near u64::MAX
    let mut bytes = u64::MAX.to_le_bytes().to_vec();
    bytes.extend_from_slice(b"{}");
    std::fs::write(&path, &bytes).unwrap();
    assert!(load_epochs(&path, None).is_err());

    // header length past end of file
    let mut bytes = 100u64.to_le_bytes().to_vec();
    bytes.extend_from_slice(b"{}");
    std::fs::write(&path, &bytes).unwrap();
    assert!(load_epochs(&path, None).is_err());

    // tensor offsets that overflow when added to the data start
    let header = format!(
        r#"{{"chan_pos":{{"dtype":"F64","shape":[1,3],"data_offsets":[{m},{m}]}}}}"#,
        m = u64::MAX
    );
    let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
    bytes.extend_from_slice(header.as_bytes());
    std::fs::write(&path, &bytes).unwrap();
    let err = load_epochs(&path, None).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(format!("{err:#}").contains("data_offsets"), "{err:#}");
}
