// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/iprmark

//! Engine dispatch, parameter loading and concurrent use.

use iprmark_core::engine::{Lifecycle, TableContext};
use iprmark_core::{
    Asset, AssetContext, AssetKind, DetectRequest, MarkError, MarkParams, Phase, SecretKey, TabularParams, Verdict,
    WatermarkEngine,
};

fn table() -> Vec<u8> {
    let mut out = String::from("code,area,label\n");
    for i in 0..400 {
        out.push_str(&format!("{},{}.{:02},plot{}\n", 1000 + i, i * 7 % 913, i % 100, i % 37));
    }
    out.into_bytes()
}

fn key(bytes: &[u8]) -> SecretKey {
    SecretKey::new(bytes.to_vec()).unwrap()
}

#[test]
fn every_kind_dispatches_to_its_marker() {
    let k = key(b"dispatch");
    let tabular = WatermarkEngine
        .embed(&Asset::new(AssetKind::Tabular, table()), &k, &MarkParams::default_for(AssetKind::Tabular))
        .unwrap();
    assert_eq!(tabular.asset.kind, AssetKind::Tabular);
    assert!(matches!(tabular.context, Some(AssetContext::Tabular(_))));

    let doc = br#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{},"geometry":{"type":"LineString","coordinates":[[0.0,0.0],[1.0,1.0],[2.0,0.5]]}}]}"#;
    let vector = WatermarkEngine
        .embed(&Asset::new(AssetKind::Vector, doc.to_vec()), &k, &MarkParams::default_for(AssetKind::Vector))
        .unwrap();
    assert_eq!(vector.asset.kind, AssetKind::Vector);
    assert!(matches!(vector.context, Some(AssetContext::Vector(_))));
}

#[test]
fn params_for_another_kind_are_rejected() {
    let err = WatermarkEngine
        .embed(&Asset::new(AssetKind::RasterHidden, vec![1, 2, 3]), &key(b"k"), &MarkParams::default_for(AssetKind::Tabular))
        .unwrap_err();
    assert!(matches!(err, MarkError::InvalidParams(_)));
}

#[test]
fn invalid_params_fail_before_any_work() {
    let params = MarkParams::Tabular(TabularParams { density: 0.0, ..Default::default() });
    let err = WatermarkEngine.embed(&Asset::new(AssetKind::Tabular, table()), &key(b"k"), &params).unwrap_err();
    assert!(matches!(err, MarkError::InvalidParams(_)));
}

#[test]
fn context_of_another_modality_is_a_mismatch() {
    let k = key(b"k");
    let raster_ctx = AssetContext::from_json(r#"{"kind":"raster","width":4,"height":4,"channels":3,"block_size":4}"#).unwrap();
    let request = DetectRequest::new(MarkParams::default_for(AssetKind::Tabular)).with_context(raster_ctx);
    let err = WatermarkEngine.detect(&Asset::new(AssetKind::Tabular, table()), &k, &request).unwrap_err();
    assert!(matches!(err, MarkError::ContextMismatch(_)));
}

#[test]
fn params_load_from_json() {
    let p = MarkParams::from_json(r#"{"kind":"raster_hidden","params":{"message":[72,73],"redundancy":3}}"#).unwrap();
    match p {
        MarkParams::RasterHidden(h) => {
            assert_eq!(h.message, b"HI");
            assert_eq!(h.redundancy, 3);
            assert_eq!(h.block_size, 4);
        }
        other => panic!("wrong variant {other:?}"),
    }
    assert!(matches!(MarkParams::from_json(r#"{"kind":"pdf","params":{}}"#), Err(MarkError::InvalidParams(_))));
}

#[test]
fn concurrent_calls_agree() {
    let data = table();
    let k = key(b"threads");
    let params = MarkParams::default_for(AssetKind::Tabular);
    let asset = Asset::new(AssetKind::Tabular, data.clone());
    let reference = WatermarkEngine.embed(&asset, &k, &params).unwrap();

    let outputs: Vec<Vec<u8>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| WatermarkEngine.embed(&asset, &k, &params).unwrap().asset.bytes))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for out in outputs {
        assert_eq!(out, reference.asset.bytes);
    }

    let request = DetectRequest::new(params.clone()).with_original(&data);
    let verdicts: Vec<Verdict> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let marked = Asset::new(AssetKind::Tabular, reference.asset.bytes.clone());
                let request = &request;
                let k = &k;
                s.spawn(move || WatermarkEngine.detect(&marked, k, request).unwrap().verdict)
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(verdicts.iter().all(|v| *v == Verdict::Present));
}

#[test]
fn stored_context_round_trips_through_json() {
    let k = key(b"ctx");
    let marked = WatermarkEngine
        .embed(&Asset::new(AssetKind::Tabular, table()), &k, &MarkParams::default_for(AssetKind::Tabular))
        .unwrap();
    let ctx = marked.context.unwrap();
    let AssetContext::Tabular(TableContext { row_count, .. }) = &ctx else { panic!("not tabular") };
    assert_eq!(*row_count, 400);

    let restored = AssetContext::from_json(&ctx.to_json().unwrap()).unwrap();
    let request = DetectRequest::new(MarkParams::default_for(AssetKind::Tabular)).with_context(restored);
    let result = WatermarkEngine.detect(&marked.asset, &k, &request).unwrap();
    assert!(result.is_present());
}

#[test]
fn lifecycle_phases() {
    let mut embed = Lifecycle::embedding();
    assert_eq!(embed.phase(), Phase::New);
    assert!(embed.advance(Phase::Embedding));
    assert!(embed.advance(Phase::Embedded));
    assert_eq!(embed.history(), &[Phase::New, Phase::Embedding, Phase::Embedded]);

    let mut detect = Lifecycle::detecting();
    assert!(detect.advance(Phase::Detecting));
    assert!(detect.advance(Verdict::Absent.into()));
    assert!(detect.phase().is_terminal());
    assert!(!detect.advance(Phase::Embedding));
    assert_eq!(detect.phase(), Phase::Absent);
}
