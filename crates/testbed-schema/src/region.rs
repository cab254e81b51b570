/// AWS region to the IATA code of its nearest airport.
///
/// The code is folded into generated cluster names so that a name alone
/// tells which region the resources live in.
pub const REGION_LABELS: &[(&str, &str)] = &[
    ("af-south-1", "CPT"),
    ("ap-east-1", "HKG"),
    ("ap-northeast-1", "NRT"),
    ("ap-northeast-2", "ICN"),
    ("ap-northeast-3", "KIX"),
    ("ap-south-1", "BOM"),
    ("ap-southeast-1", "SIN"),
    ("ap-southeast-2", "SYD"),
    ("ca-central-1", "YUL"),
    ("cn-north-1", "BJS"),
    ("cn-northwest-1", "ZHY"),
    ("eu-central-1", "FRA"),
    ("eu-north-1", "ARN"),
    ("eu-south-1", "MXP"),
    ("eu-west-1", "DUB"),
    ("eu-west-2", "LHR"),
    ("eu-west-3", "CDG"),
    ("me-south-1", "BAH"),
    ("sa-east-1", "GRU"),
    ("us-east-1", "IAD"),
    ("us-east-2", "CMH"),
    ("us-gov-east-1", "CMH"),
    ("us-gov-west-1", "PDT"),
    ("us-west-1", "SFO"),
    ("us-west-2", "PDX"),
];

pub fn region_label(region: &str) -> Option<&'static str> {
    REGION_LABELS
        .iter()
        .find(|(name, _)| *name == region)
        .map(|(_, label)| *label)
}
