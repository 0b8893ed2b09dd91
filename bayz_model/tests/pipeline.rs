// End-to-end: fit, save, load, then generate through the cache and convert
// the result to pitches, using only the public API.

use std::sync::Arc;

use bayz_model::pitch::{PitchSelection, sequence_pitches};
use bayz_model::{
    EmbeddingStore, GenerationCache, KeyedVectors, MarkovTypeSource, Sequencer, TypeModel,
    TypeModelConfig,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn embedding() -> KeyedVectors {
    KeyedVectors::new(
        2,
        vec![
            ("C_E_G".to_string(), vec![10.0, 10.0]),
            ("C_E".to_string(), vec![10.5, 9.0]),
            ("D".to_string(), vec![-10.0, -10.0]),
            ("F_A".to_string(), vec![-9.0, -10.5]),
        ],
    )
    .unwrap()
}

fn corpus() -> Vec<Vec<String>> {
    let line = "C_E_G D C_E F_A C_E_G D C_E F_A";
    vec![line.split(' ').map(str::to_string).collect(); 25]
}

fn config() -> TypeModelConfig {
    TypeModelConfig {
        n_components: 2,
        fit_seed: 3,
        ..Default::default()
    }
}

#[test]
fn fit_save_load_generate() {
    let mut model = TypeModel::new(embedding(), config()).unwrap();
    model.fit(&corpus()).unwrap();
    assert_eq!(model.component_count(), 2);

    let path = std::env::temp_dir().join(format!("bayz_pipeline_{}.json", std::process::id()));
    model.save(&path).unwrap();
    let mut loaded = TypeModel::new(embedding(), config()).unwrap();
    loaded.load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded.mixture(), model.mixture());

    let labelled = loaded.label_sequences(&corpus()).unwrap();
    // Chords and single notes fall into different components and alternate.
    let first = &labelled[0];
    assert_ne!(first[0], first[1]);
    assert_eq!(first[0], first[2]);

    let source = MarkovTypeSource::fit(&labelled, loaded.component_count(), 6..=6).unwrap();
    let sequencer = Sequencer::new(Arc::new(loaded), "_");
    let mut cache = GenerationCache::new(sequencer, source, 3, StdRng::seed_from_u64(12)).unwrap();

    let vocabulary: Vec<String> = cache.sequencer().model().embedding().vocabulary().to_vec();
    let mut served = Vec::new();
    for _ in 0..4 {
        let sequence = cache.next().unwrap();
        assert_eq!(sequence.len(), 6);
        for token in &sequence {
            assert!(vocabulary.contains(&token.join("_")), "{token:?}");
        }
        let pitches = sequence_pitches(&sequence, 4, PitchSelection::All);
        assert!(pitches.len() >= 6);
        assert!(pitches.iter().all(|p| (60..72).contains(p)));
        served.push(sequence);
    }
    assert_eq!(cache.generated_count(), 4);

    cache.rewind();
    for expected in &served {
        assert_eq!(&cache.next().unwrap(), expected);
    }
}

#[test]
fn shared_model_serves_several_sequencers() {
    let mut model = TypeModel::new(embedding(), config()).unwrap();
    model.fit(&corpus()).unwrap();
    let model = Arc::new(model);

    let handles: Vec<_> = (0..3)
        .map(|seed| {
            let sequencer = Sequencer::new(Arc::clone(&model), "_");
            std::thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(seed);
                sequencer.realize(&[0, 1, 0, 1], &mut rng).unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().len(), 4);
    }
    assert_eq!(model.cached_component_count(), 2);
}
