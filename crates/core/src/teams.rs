//! Random team splitting and table rendering.

use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Teams {
    pub first: Vec<String>,
    pub second: Vec<String>,
}

/// Shuffles the players and splits them into two teams. With an odd
/// count the extra player lands on team one.
pub fn split_into_teams<R: Rng>(players: &[String], rng: &mut R) -> Teams {
    let mut shuffled = players.to_vec();
    shuffled.shuffle(rng);

    let first_len = shuffled.len() / 2 + shuffled.len() % 2;
    let second = shuffled.split_off(first_len);

    Teams { first: shuffled, second }
}

/// Renders the two teams as the fixed-width ASCII table posted to chat.
pub fn render_table(teams: &Teams) -> String {
    let column_width = teams
        .first
        .iter()
        .chain(teams.second.iter())
        .map(String::len)
        .max()
        .unwrap_or(0)
        + 5;
    let gap = " ".repeat(10);

    let mut table = format!("Team 1{}|{gap}Team 2\n", " ".repeat(column_width - 5));
    table.push_str(&format!("{}+{}\n", "-".repeat(column_width), "-".repeat(column_width)));

    let rows = teams.first.len().max(teams.second.len());
    for row in 0..rows {
        let left = teams.first.get(row).map(String::as_str).unwrap_or("");
        let right = teams.second.get(row).map(String::as_str).unwrap_or("");
        table.push_str(&format!(
            "{left}{}|{gap}{right}\n",
            " ".repeat(column_width - left.len())
        ));
    }

    table
}
