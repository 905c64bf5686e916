use sonic_sandbox_core::config::ProceduralConfig;
use sonic_sandbox_core::procedural::{
    AdaptiveProceduralSystem, AudioMetrics, ChaosType, ChaoticGenerator, MarkovGenerator, NoiseGenerator,
    ParameterGenerator, ParameterSlot, ProceduralController, SpectralGenerator,
};

#[test]
fn logistic_frequency_stays_in_range() {
    let mut controller = ProceduralController::new(&ProceduralConfig::default());
    controller.set_frequency_range(100.0, 2000.0);

    let mut logistic = ChaoticGenerator::with_seed(ChaosType::Logistic, 42);
    logistic.set_chaos_parameter(3.9);
    controller.set_frequency_generator(logistic);

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for i in 0..1000 {
        let p = controller.generate_parameters();
        assert!(
            (100.0..=2000.0).contains(&p.frequency),
            "call {i}: frequency {} out of range",
            p.frequency
        );
        lo = lo.min(p.frequency);
        hi = hi.max(p.frequency);
    }
    assert!(hi - lo > 1000.0, "chaotic frequency should cover most of the range: {lo}..{hi}");
}

#[test]
fn every_generator_kind_respects_ranges() {
    let mut controller = ProceduralController::default();
    controller.set_frequency_range(200.0, 400.0);
    controller.set_amplitude_range(0.2, 0.3);
    controller.set_richness_range(0.0, 0.5);
    controller.set_duration_range(0.05, 0.2);

    let mut markov = MarkovGenerator::with_seed(1);
    markov.add_transition(0.5, 1.0, 1.0);
    markov.add_transition(1.0, 0.0, 1.0);
    markov.add_transition(0.0, 0.5, 1.0);

    controller.set_frequency_generator(ChaoticGenerator::new(ChaosType::Lorenz));
    controller.set_amplitude_generator(markov);
    controller.set_spectral_generator(SpectralGenerator::default().with_harmonic(1.0, 1.0));
    controller.set_duration_generator(ChaoticGenerator::new(ChaosType::Henon));

    for _ in 0..2000 {
        let p = controller.generate_parameters();
        assert!(controller.range(ParameterSlot::Frequency).contains(p.frequency));
        assert!(controller.range(ParameterSlot::Amplitude).contains(p.amplitude));
        assert!(controller.range(ParameterSlot::Richness).contains(p.richness));
        assert!(controller.range(ParameterSlot::Duration).contains(p.duration));
    }
}

#[test]
fn independently_seeded_generators_diverge() {
    let mut a = NoiseGenerator::with_seed(100);
    let mut b = NoiseGenerator::with_seed(200);
    let va: Vec<f64> = (0..500).map(|_| a.next_value()).collect();
    let vb: Vec<f64> = (0..500).map(|_| b.next_value()).collect();
    assert_ne!(va, vb);

    a.set_seed(200);
    let va: Vec<f64> = (0..500).map(|_| a.next_value()).collect();
    assert_eq!(va, vb);
}

#[test]
fn adaptive_feedback_loop_stays_bounded() {
    let config = ProceduralConfig::default();
    let mut system = AdaptiveProceduralSystem::new(&config);
    system.set_adaptation_rate(1.0);

    // Feed each parameter set back as a crude measurement of itself.
    let mut metrics = AudioMetrics::default();
    for _ in 0..5000 {
        let p = system.update(&metrics);
        assert!(config.frequency_range.contains(p.frequency));
        assert!(config.amplitude_range.contains(p.amplitude));
        assert!(config.richness_range.contains(p.richness));
        assert!(config.duration_range.contains(p.duration));
        metrics = AudioMetrics {
            energy: p.amplitude,
            centroid: p.frequency,
            brightness: p.richness,
        };
    }
}
