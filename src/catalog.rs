//! The Certificate-of-Analysis document family.
//!
//! Every known field is a [`FieldKind`] variant carrying everything the
//! pipeline needs to know about it: the canonical key, how it is labelled in
//! templates, which corrupted keys upstream extraction produces for it, which
//! contexts point at it and how booleans for it read.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    ProductName,
    BatchNumber,
    ManufacturingDate,
    ExpiryDate,
    Appearance,
    SodiumHyaluronateContent,
    MolecularWeight,
    Ph,
    LossOnDrying,
    Protein,
    HeavyMetals,
    TotalBacteria,
    YeastAndMolds,
    EscherichiaColi,
    StaphylococcusAureus,
    PseudomonasAeruginosa,
}

impl FieldKind {
    /// Test-panel order of a standard certificate.
    pub const ALL: [FieldKind; 16] = [
        FieldKind::ProductName,
        FieldKind::BatchNumber,
        FieldKind::ManufacturingDate,
        FieldKind::ExpiryDate,
        FieldKind::Appearance,
        FieldKind::SodiumHyaluronateContent,
        FieldKind::MolecularWeight,
        FieldKind::Ph,
        FieldKind::LossOnDrying,
        FieldKind::Protein,
        FieldKind::HeavyMetals,
        FieldKind::TotalBacteria,
        FieldKind::YeastAndMolds,
        FieldKind::EscherichiaColi,
        FieldKind::StaphylococcusAureus,
        FieldKind::PseudomonasAeruginosa,
    ];

    pub fn canonical_name(self) -> &'static str {
        match self {
            FieldKind::ProductName => "product_name",
            FieldKind::BatchNumber => "batch_number",
            FieldKind::ManufacturingDate => "manufacturing_date",
            FieldKind::ExpiryDate => "expiry_date",
            FieldKind::Appearance => "appearance",
            FieldKind::SodiumHyaluronateContent => "sodium_hyaluronate_content",
            FieldKind::MolecularWeight => "molecular_weight",
            FieldKind::Ph => "ph",
            FieldKind::LossOnDrying => "loss_on_drying",
            FieldKind::Protein => "protein",
            FieldKind::HeavyMetals => "heavy_metals",
            FieldKind::TotalBacteria => "total_bacteria",
            FieldKind::YeastAndMolds => "yeast_and_molds",
            FieldKind::EscherichiaColi => "escherichia_coli",
            FieldKind::StaphylococcusAureus => "staphylococcus_aureus",
            FieldKind::PseudomonasAeruginosa => "pseudomonas_aeruginosa",
        }
    }

    pub fn display_label(self) -> &'static str {
        match self {
            FieldKind::ProductName => "Product name",
            FieldKind::BatchNumber => "Batch number",
            FieldKind::ManufacturingDate => "Manufacturing date",
            FieldKind::ExpiryDate => "Expiry date",
            FieldKind::Appearance => "Appearance",
            FieldKind::SodiumHyaluronateContent => "Sodium hyaluronate content",
            FieldKind::MolecularWeight => "Molecular weight",
            FieldKind::Ph => "pH",
            FieldKind::LossOnDrying => "Loss on drying",
            FieldKind::Protein => "Protein",
            FieldKind::HeavyMetals => "Heavy metals",
            FieldKind::TotalBacteria => "Total bacteria",
            FieldKind::YeastAndMolds => "Yeast and molds",
            FieldKind::EscherichiaColi => "E. coli",
            FieldKind::StaphylococcusAureus => "S. aureus",
            FieldKind::PseudomonasAeruginosa => "P. aeruginosa",
        }
    }

    /// Keys an earlier templating pass mangled out of the row label and its
    /// specification text (`_ph__5085_` is "pH" with spec "5.0-8.5").
    pub fn corrupted_aliases(self) -> &'static [&'static str] {
        match self {
            FieldKind::ProductName => &["_product_name_"],
            FieldKind::BatchNumber => &["_batch_number_"],
            FieldKind::ManufacturingDate => &["_manufacturing_date_"],
            FieldKind::ExpiryDate => &["_expiry_date_"],
            FieldKind::Appearance => &["_appearance__white_solid_powder_"],
            FieldKind::SodiumHyaluronateContent => &["_sodium_hyaluronate_content___95_"],
            FieldKind::MolecularWeight => &["_molecular_weight__da_"],
            FieldKind::Ph => &["_ph__5085_"],
            FieldKind::LossOnDrying => &["_loss_on_drying___10_"],
            FieldKind::Protein => &["_protein___01_"],
            FieldKind::HeavyMetals => &["_heavy_metals___20_ppm_"],
            FieldKind::TotalBacteria => &["_total_bacteria___100_cfu_g_"],
            FieldKind::YeastAndMolds => &["_yeast_and_molds___50_cfu_g_"],
            FieldKind::EscherichiaColi => &["_e_coli__negative_"],
            FieldKind::StaphylococcusAureus => &["_s_aureus__negative_"],
            FieldKind::PseudomonasAeruginosa => &["_p_aeruginosa__negative_"],
        }
    }

    /// Row label as it is printed in a test panel.
    pub fn label_pattern(self) -> &'static str {
        match self {
            FieldKind::ProductName => r"(?i)product\s*name",
            FieldKind::BatchNumber => r"(?i)batch\s*(?:no\.?|number|#)|lot\s*(?:no\.?|number)",
            FieldKind::ManufacturingDate => {
                r"(?i)manufactur(?:ing|e)\s*date|date\s*of\s*manufacture|mfg\.?\s*date"
            }
            FieldKind::ExpiryDate => r"(?i)expiry\s*date|expiration\s*date|exp\.?\s*date|retest\s*date",
            FieldKind::Appearance => r"(?i)appearance",
            FieldKind::SodiumHyaluronateContent => r"(?i)sodium\s*hyaluronate\s*content",
            FieldKind::MolecularWeight => r"(?i)molecular\s*weight",
            FieldKind::Ph => r"\b(?:pH|PH|ph)\b",
            FieldKind::LossOnDrying => r"(?i)loss\s*on\s*drying",
            FieldKind::Protein => r"(?i)\bprotein\b",
            FieldKind::HeavyMetals => r"(?i)heavy\s*metals?",
            FieldKind::TotalBacteria => r"(?i)total\s*(?:bacteria|aerobic\s*(?:microbial\s*)?count|plate\s*count)",
            FieldKind::YeastAndMolds => r"(?i)yeasts?\s*(?:and|&)\s*mou?lds?",
            FieldKind::EscherichiaColi => r"(?i)\be\.?\s*coli\b|escherichia\s*coli",
            FieldKind::StaphylococcusAureus => r"(?i)\bs\.?\s*aureus\b|staphylococcus\s*aureus",
            FieldKind::PseudomonasAeruginosa => r"(?i)\bp\.?\s*aeruginosa\b|pseudomonas\s*aeruginosa",
        }
    }

    /// Looser pattern used when scoring a slot's surroundings.
    pub fn context_pattern(self) -> &'static str {
        match self {
            FieldKind::ProductName => r"(?i)product\s*name|name\s*of\s*(?:the\s*)?product|material\s*name",
            FieldKind::BatchNumber => r"(?i)batch\s*(?:no\.?|number|#)|lot\s*(?:no\.?|number|#)",
            FieldKind::ManufacturingDate => {
                r"(?i)manufactur\w*\s*date|date\s*of\s*manufactur\w*|mfg\.?\s*date|production\s*date"
            }
            FieldKind::ExpiryDate => {
                r"(?i)expir\w*\s*date|exp\.?\s*date|date\s*of\s*expiry|retest\s*date|best\s*before"
            }
            FieldKind::Appearance => r"(?i)appearance|description|white\s*(?:solid\s*)?powder",
            FieldKind::SodiumHyaluronateContent => r"(?i)sodium\s*hyaluronate|\bassay\b|\bpurity\b|\bcontent\b",
            FieldKind::MolecularWeight => r"(?i)molecular\s*(?:weight|mass)|\bm\.?w\.?\b",
            FieldKind::Ph => r"\b(?:pH|PH|ph)\b",
            FieldKind::LossOnDrying => r"(?i)loss\s*on\s*drying|\blod\b|moisture",
            FieldKind::Protein => r"(?i)protein",
            FieldKind::HeavyMetals => r"(?i)heavy\s*metals?|\bpb\b",
            FieldKind::TotalBacteria => r"(?i)total\s*(?:bacteria\w*|aerobic|plate)|\btamc\b|bacterial?\s*count",
            FieldKind::YeastAndMolds => r"(?i)yeasts?\s*(?:and|&)\s*mou?lds?|\btymc\b",
            FieldKind::EscherichiaColi => r"(?i)\be\.?\s*coli\b|escherichia",
            FieldKind::StaphylococcusAureus => r"(?i)\bs\.?\s*aureus\b|staphylococcus",
            FieldKind::PseudomonasAeruginosa => r"(?i)\bp\.?\s*aeruginosa\b|pseudomonas",
        }
    }

    /// Field names the context pattern vouches for.
    pub fn context_keys(self) -> &'static [&'static str] {
        match self {
            FieldKind::ProductName => &["product_name", "material_name", "name_of_product"],
            FieldKind::BatchNumber => &["batch_number", "batch_no", "lot_number", "lot_no"],
            FieldKind::ManufacturingDate => {
                &["manufacturing_date", "manufacture_date", "mfg_date", "production_date"]
            }
            FieldKind::ExpiryDate => &["expiry_date", "expiration_date", "exp_date", "retest_date"],
            FieldKind::Appearance => &["appearance", "description"],
            FieldKind::SodiumHyaluronateContent => {
                &["sodium_hyaluronate_content", "sodium_hyaluronate", "assay", "purity"]
            }
            FieldKind::MolecularWeight => &["molecular_weight", "molecular_mass", "mw"],
            FieldKind::Ph => &["ph", "ph_value"],
            FieldKind::LossOnDrying => &["loss_on_drying", "lod", "moisture"],
            FieldKind::Protein => &["protein", "protein_content"],
            FieldKind::HeavyMetals => &["heavy_metals", "heavy_metal"],
            FieldKind::TotalBacteria => {
                &["total_bacteria", "total_aerobic_count", "total_plate_count", "tamc"]
            }
            FieldKind::YeastAndMolds => &["yeast_and_molds", "yeasts_and_moulds", "tymc"],
            FieldKind::EscherichiaColi => &["escherichia_coli", "e_coli"],
            FieldKind::StaphylococcusAureus => &["staphylococcus_aureus", "s_aureus"],
            FieldKind::PseudomonasAeruginosa => &["pseudomonas_aeruginosa", "p_aeruginosa"],
        }
    }

    /// Labels for a yes/no extraction of a descriptive field.
    pub fn boolean_labels(self) -> Option<(&'static str, &'static str)> {
        match self {
            FieldKind::Appearance => Some(("White solid powder", "Not a white solid powder")),
            _ => None,
        }
    }

    /// Where a missing value can be recovered from raw OCR text. Group 1 is
    /// the value.
    pub fn backfill_pattern(self) -> Option<&'static str> {
        match self {
            FieldKind::MolecularWeight => Some(
                r"(?i)molecular\s*weight[^\n\d]{0,40}(\d+(?:[.,]\d+)?\s*[x×*]\s*10\s*(?:\^\s*-?\d+|[⁻⁰¹²³⁴⁵⁶⁷⁸⁹]+)(?:\s*da\b)?)",
            ),
            _ => None,
        }
    }

    pub fn from_canonical(name: &str) -> Option<FieldKind> {
        Self::ALL.into_iter().find(|kind| kind.canonical_name() == name)
    }
}
