use std::collections::HashSet;

use certfill::{
    BooleanRendering, ContextScorer, ExtractedFieldSet, FieldValue, FillEngine, FillOptions, MatchPolicy,
    MatchSource, RuleBook, SlotOrigin,
};

const CERTIFICATE: &str = r#"# Certificate of Analysis

Product name: {}

Batch Number: {}

| Test | Specification | Result |
|------|---------------|--------|
| Appearance | White solid powder | {} |
| Molecular weight | 1.0-1.8 x 10^6 Da | {} |
| pH | 5.0-8.5 | {} |
| Loss on drying | ≤10% | {} |
| E. coli | Negative | {} |
"#;

fn fields<const N: usize>(pairs: [(&str, FieldValue); N]) -> ExtractedFieldSet {
    pairs.into_iter().collect()
}

#[test]
fn test_named_slots_filled_in_order() {
    let engine = FillEngine::new();
    let template = engine.template("Batch Number: {}\npH {}");
    assert_eq!(template.field_names(), vec!["batch_number", "ph"]);

    let data = fields([("batch_number", "25042211".into()), ("ph", "6.8".into())]);
    assert_eq!(engine.preview(&template, &data), "Batch Number: 25042211\npH 6.8");
}

#[test]
fn test_corrupted_keys_normalized() {
    let engine = FillEngine::new();
    let raw = fields([
        ("_ph__5085_", "6.8".into()),
        ("_appearance__white_solid_powder_", true.into()),
    ]);
    let expected = fields([("ph", "6.8".into()), ("appearance", "White solid powder".into())]);
    assert_eq!(engine.normalize(&raw, None), expected);
}

#[test]
fn test_scorer_prefers_pattern_match() {
    let rules = RuleBook::builtin();
    let scorer = ContextScorer::new(&rules);
    let data = fields([
        ("molecular_weight", "1.70 x 10⁶".into()),
        ("batch_number", "25042211".into()),
    ]);

    let (field, score) = scorer.best("Molecular weight", &data, &HashSet::new()).unwrap();
    assert_eq!(field, "molecular_weight");
    assert!(score >= 100);
    assert_eq!(scorer.score("Molecular weight", "batch_number", &"25042211".into()), 0);
}

#[test]
fn test_unstructured_template_gets_catalog_fields() {
    let engine = FillEngine::new();
    let template = engine.template("To whom it may concern,\nplease find the results attached.");
    assert_eq!(template.slots().len(), 16);
    assert!(template.slots().iter().all(|s| s.origin == SlotOrigin::Fallback));
    assert_eq!(template.field_names()[0], "product_name");
    assert_eq!(template.field_names()[15], "pseudomonas_aeruginosa");
}

#[test]
fn test_consuming_policy_moves_to_next_best() {
    let engine = FillEngine::new();
    let template = engine.template("| Loss on drying | {} |\n| Loss on drying | {} |");
    let data = fields([("lod", "4.1%".into()), ("moisture_reading", FieldValue::from(3i64))]);

    let consumed = engine.fill(&template, &data, FillOptions::render().with_policy(MatchPolicy::Consuming));
    assert_eq!(consumed.text, "| Loss on drying | 4.1% |\n| Loss on drying | 3 |");
    assert_eq!(consumed.matches[0].field.as_deref(), Some("lod"));
    assert_eq!(consumed.matches[1].field.as_deref(), Some("moisture_reading"));

    let shared = engine.render(&template, &data);
    assert_eq!(shared, "| Loss on drying | 4.1% |\n| Loss on drying | 4.1% |");

    let single = fields([("lod", "4.1%".into())]);
    let outcome = engine.fill(&template, &single, FillOptions::preview().with_policy(MatchPolicy::Consuming));
    assert_eq!(outcome.text, "| Loss on drying | 4.1% |\n| Loss on drying | [EMPTY] |");
    assert_eq!(outcome.matches[1].source, MatchSource::Unmatched);
}

#[test]
fn test_markdown_certificate_end_to_end() {
    let engine = FillEngine::new();
    let template = engine.template_from_markdown(CERTIFICATE).unwrap();
    assert_eq!(
        template.field_names(),
        vec![
            "product_name",
            "batch_number",
            "appearance",
            "molecular_weight",
            "ph",
            "loss_on_drying",
            "escherichia_coli"
        ]
    );

    let raw = fields([
        ("product_name", "Sodium Hyaluronate".into()),
        ("batch_number", "25042211".into()),
        ("_appearance__white_solid_powder_", true.into()),
        ("molecular_weight", FieldValue::Null),
        ("_ph__5085_", "6.8".into()),
        ("_loss_on_drying___10_", "4.1%".into()),
        ("escherichia_coli", true.into()),
    ]);
    let ocr = "CERTIFICATE OF ANALYSIS\nMolecular weight 1.42 x 10^6 Da\npH 6.8";
    let data = engine.normalize(&raw, Some(ocr));

    let out = engine.render(&template, &data);
    assert!(out.contains("Product name: Sodium Hyaluronate\n"));
    assert!(out.contains("Batch Number: 25042211\n"));
    assert!(out.contains("| Appearance | White solid powder | White solid powder |"));
    assert!(out.contains("| Molecular weight | 1.0-1.8 x 10^6 Da | 1.42 x 10^6 Da |"));
    assert!(out.contains("| pH | 5.0-8.5 | 6.8 |"));
    assert!(out.contains("| Loss on drying | ≤10% | 4.1% |"));
    assert!(out.ends_with("| E. coli | Negative | Complies |"));

    let spec = FillOptions::render().with_booleans(BooleanRendering::NearestSpecification);
    let out = engine.fill(&template, &data, spec).text;
    assert!(out.ends_with("| E. coli | Negative | Negative |"));
}

#[test]
fn test_normalization_is_idempotent() {
    let engine = FillEngine::new();
    let raw = fields([
        ("_heavy_metals___20_ppm_", "<10 ppm".into()),
        ("_e_coli__negative_", false.into()),
        ("_unknown__x_", "dropped".into()),
        ("heavy_metals", "<5 ppm".into()),
        ("appearance", true.into()),
        ("protein", FieldValue::Null),
    ]);
    let aux = Some("Molecular weight: 1.6 x 10^6");

    let once = engine.normalize(&raw, aux);
    assert_eq!(engine.normalize(&once, aux), once);
    assert_eq!(once.get("heavy_metals"), Some(&FieldValue::from("<5 ppm")));
    assert_eq!(once.get("appearance"), Some(&FieldValue::from("White solid powder")));
    assert!(!once.contains_key("_unknown__x_"));
}

#[test]
fn test_every_slot_gets_a_name_and_an_outcome() {
    let engine = FillEngine::new();
    for text in [
        "{}",
        "{}\n{}\n\n{}",
        "Remarks: {} | {}",
        "Product: {{ product_name }} and ${batch_no}",
        CERTIFICATE,
        "",
    ] {
        let template = engine.template(text);
        assert!(!template.slots().is_empty());
        assert!(template.slots().iter().all(|s| !s.name.is_empty()));

        let outcome = engine.fill(&template, &ExtractedFieldSet::new(), FillOptions::preview());
        assert_eq!(outcome.matches.len(), template.slots().len());
        assert!(outcome.matches.iter().all(|m| m.source == MatchSource::Unmatched));
    }
}

#[test]
fn test_slot_offsets_increase() {
    let engine = FillEngine::new();
    let flat = certfill::flatten_markdown(CERTIFICATE).unwrap();
    let template = engine.template(&flat);

    let starts: Vec<usize> = template
        .slots()
        .iter()
        .map(|s| s.span.as_ref().map(|r| r.start).unwrap())
        .collect();
    assert!(starts.windows(2).all(|w| w[0] < w[1]));
    for (i, slot) in template.slots().iter().enumerate() {
        assert_eq!(slot.index, i);
    }
}

#[test]
fn test_values_written_verbatim() {
    let engine = FillEngine::new();
    let template = engine.template("Content: {}\nProtein: {}\nAssay: {}\nMW: {}\nTotal bacteria: {}");
    let data = fields([
        ("content", "≥ 95.0 %".into()),
        ("protein", "≤0.1%".into()),
        ("assay", "96.20%".into()),
        ("mw", "1.70 x 10^6 Da".into()),
        ("total_bacteria", "<10 CFU/g".into()),
    ]);

    assert_eq!(
        engine.render(&template, &data),
        "Content: ≥ 95.0 %\nProtein: ≤0.1%\nAssay: 96.20%\nMW: 1.70 x 10^6 Da\nTotal bacteria: <10 CFU/g"
    );
}

#[test]
fn test_same_text_same_template_id() {
    let engine = FillEngine::new();
    let a = engine.template("Batch Number: {}");
    let b = engine.template("Batch Number: {}");
    let c = engine.template("pH {}");
    assert_eq!(a.id(), b.id());
    assert_ne!(a.id(), c.id());
    assert!(a.id().starts_with("tpl_"));

    let named = engine.template_with_id("coa-2025-04", "Batch Number: {}");
    assert_eq!(named.id(), "coa-2025-04");
}

#[test]
fn test_yaml_rules_extend_the_catalog() {
    let rules = RuleBook::builtin()
        .with_yaml(
            r#"
fields:
  - name: viscosity
    label: "intrinsic\\s*viscosity"
    display: "Intrinsic viscosity"
    aliases: ["_intrinsic_viscosity__1623_"]
    context: "viscosity"
    keys: [viscosity, intrinsic_viscosity]
"#,
        )
        .unwrap();
    let engine = FillEngine::with_rules(rules);

    let template = engine.template("| Intrinsic viscosity | 1.6-2.3 m3/kg | {} |");
    assert_eq!(template.field_names(), vec!["viscosity"]);

    let data = engine.normalize(&fields([("_intrinsic_viscosity__1623_", "1.92 m3/kg".into())]), None);
    assert_eq!(engine.render(&template, &data), "| Intrinsic viscosity | 1.6-2.3 m3/kg | 1.92 m3/kg |");
}

#[test]
fn test_markdown_rows_without_markers_fill_result_cells() {
    let engine = FillEngine::new();
    let template = engine
        .template_from_markdown("| Test | Specification | Result |\n|---|---|---|\n| pH | 5.0-8.5 | |\n| Protein | ≤0.1% | |\n")
        .unwrap();
    assert_eq!(template.field_names(), vec!["ph", "protein"]);

    let data = fields([("ph", "6.8".into()), ("protein", "0.02%".into())]);
    let out = engine.render(&template, &data);
    assert!(out.contains("| pH | 5.0-8.5 | 6.8"));
    assert!(out.contains("| Protein | ≤0.1% | 0.02%"));
}

#[test]
fn test_pharmacopoeia_prose_does_not_outvote_markers() {
    let engine = FillEngine::new();
    let template = engine.template(
        "Batch Number: {}\nTested according to Ph. Eur. monograph 1472; pH and protein limits per Ph. Eur. 2.2.3",
    );
    assert_eq!(template.slots().len(), 1);
    assert_eq!(template.slots()[0].origin, SlotOrigin::BareMarker);

    let data = fields([("batch_number", "25042211".into()), ("ph", "6.8".into())]);
    assert_eq!(
        engine.render(&template, &data),
        "Batch Number: 25042211\nTested according to Ph. Eur. monograph 1472; pH and protein limits per Ph. Eur. 2.2.3"
    );
}
