use std::f64::consts::PI;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use exg_ransac::{ChannelInfo, Epochs, Info, Ransac, RansacConfig};
use ndarray::Array3;

/// 32 channels on a hemisphere, 40 epochs × 256 samples.
fn synthetic_epochs() -> Epochs {
    let n_ch = 32;
    let golden = PI * (3.0 - 5.0_f64.sqrt());
    let chs = (0..n_ch)
        .map(|i| {
            let z = 1.0 - (i as f64 + 0.5) / n_ch as f64;
            let r = (1.0 - z * z).sqrt();
            let th = golden * i as f64;
            ChannelInfo::eeg(format!("EEG{i:03}"), [0.09 * r * th.cos(), 0.09 * r * th.sin(), 0.09 * z])
        })
        .collect();
    let data = Array3::from_shape_fn((40, n_ch, 256), |(e, c, t)| {
        (t as f64 * 0.05 + e as f64).sin() * (1.0 + 0.01 * c as f64) + 0.05 * ((c * 7 + t) as f64).cos()
    });
    Epochs::new(data, Info::new(chs, 256.0)).unwrap()
}

fn bench_fit_serial(c: &mut Criterion) {
    let epochs = synthetic_epochs();
    c.bench_function("fit [40×32×256] n_jobs=1", |b| {
        b.iter(|| {
            let mut ransac = Ransac::new(RansacConfig::default());
            ransac.fit(black_box(&epochs)).unwrap();
            black_box(ransac.bad_chs().unwrap().len())
        })
    });
}

fn bench_fit_parallel(c: &mut Criterion) {
    let epochs = synthetic_epochs();
    c.bench_function("fit [40×32×256] n_jobs=4", |b| {
        b.iter(|| {
            let mut ransac = Ransac::new(RansacConfig { n_jobs: 4, ..Default::default() });
            ransac.fit(black_box(&epochs)).unwrap();
            black_box(ransac.bad_chs().unwrap().len())
        })
    });
}

criterion_group!(benches, bench_fit_serial, bench_fit_parallel);
criterion_main!(benches);
