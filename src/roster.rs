//! Roster import from CSV text.

use crate::models::Player;

fn parse_presence(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "yes" | "y" | "true" | "1" | "present" | "here" => Some(true),
        "no" | "n" | "false" | "0" | "absent" | "away" => Some(false),
        _ => None,
    }
}

/// Parse header-less `name[,present]` rows into players. Blank names are skipped;
/// presence defaults to present when missing or unrecognised.
pub fn parse_roster_csv(text: &str) -> Result<Vec<Player>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let mut players = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(name) = record.get(0).map(str::trim).filter(|n| !n.is_empty()) else {
            continue;
        };
        let present = match record.get(1) {
            Some(v) => parse_presence(v).unwrap_or_else(|| {
                log::warn!("Unrecognised presence {:?} for {}, assuming present", v, name);
                true
            }),
            None => true,
        };
        players.push(Player::with_presence(name, present));
    }
    Ok(players)
}
