//! Every user-facing line the bot says, in one place.
//!
//! The bot speaks in Alfred's butler register. Keeping the strings as
//! pure builders makes the command flows testable without a transport.

use herald_core::poller::CycleReport;
use herald_core::registry::TrackedGame;

pub fn announcement(game_name: &str, url: &str) -> String {
    format!("\u{1F4E2} **New update for {game_name}!**\n{url}")
}

pub fn help_text(prefix: &str) -> String {
    format!(
        "Here are all available commands, sir:\n\
         **Game Tracking**\n\
         \u{2022} `{prefix}gameUpdates` - Check for new updates for all tracked games\n\
         \u{2022} `{prefix}trackedGames` - Display all currently tracked games\n\
         \u{2022} `{prefix}addTrackedGame` - Add a new game to track\n\
         \u{2022} `{prefix}removeTrackedGame` - Remove a game from tracking\n\
         **Team Management**\n\
         \u{2022} `{prefix}randomTeams` - Create random teams from users in a voice channel\n\
         **Fun Commands**\n\
         \u{2022} `{prefix}ping` - Check if I'm online\n\
         \u{2022} `{prefix}random` - Generate a random number between 1-100\n\
         \u{2022} `{prefix}8ball [question]` - Ask the Magic 8-Ball a question\n\
         I automatically check for game updates every hour and post them in the updates channel."
    )
}

pub fn ping_reply() -> String {
    "Pong!".to_owned()
}

pub fn random_number(value: u8) -> String {
    format!("Your random number is: {value}")
}

pub fn eight_ball_reply(question: &str, answer: &str) -> String {
    if question.is_empty() {
        format!("Alfred says: {answer}")
    } else {
        format!("Question: \"{question}\"\nAlfred says: {answer}")
    }
}

pub fn tracked_games_list(games: &[TrackedGame]) -> String {
    let listing = games
        .iter()
        .map(|game| format!("\u{2022} {} ({})", game.name, game.app_id))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Here are the currently tracked games, sir:\n{listing}")
}

pub fn no_games_tracked() -> String {
    "There are no games currently being tracked, sir. Use the add command to begin monitoring one."
        .to_owned()
}

pub fn cycle_summary(report: &CycleReport) -> String {
    if report.no_games_tracked() {
        return no_games_tracked();
    }

    let total = report.total_new_items();
    if total == 0 {
        return format!(
            "I've checked for updates for all {} tracked games, sir. No new announcements were found.",
            report.tracked_games
        );
    }

    let breakdown = report
        .updates
        .iter()
        .map(|update| format!("{} ({})", update.display_name, update.new_items))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "I've found {total} new game updates across {breakdown}, sir. I've posted them in the updates channel."
    )
}

pub fn check_already_running() -> String {
    "I'm already in the middle of checking for updates, sir. One moment please.".to_owned()
}

pub fn add_prompt() -> String {
    "Please provide the game name and Steam app ID separated by a comma (e.g., Rematch,2138720)"
        .to_owned()
}

pub fn add_invalid_format() -> String {
    "Invalid format. Please use: Game Name,AppID".to_owned()
}

pub fn added_game(game: &TrackedGame) -> String {
    format!("Successfully added \"{}\" ({}) to tracked games", game.name, game.app_id)
}

pub fn remove_prompt() -> String {
    "Please provide the Steam app ID of the game you wish to remove.".to_owned()
}

pub fn removed_game(game: &TrackedGame) -> String {
    format!("Successfully removed \"{}\" ({}) from tracked games", game.name, game.app_id)
}

pub fn prompt_timed_out() -> String {
    "The operation timed out, sir. Please try again.".to_owned()
}

pub fn teams_intro(voice_channel_name: Option<&str>) -> String {
    match voice_channel_name {
        Some(name) => format!(
            "I've taken the liberty of organizing the participants from {name} into teams, sir:"
        ),
        None => "I've prepared the teams as requested, sir:".to_owned(),
    }
}

pub fn teams_code_block(table: &str) -> String {
    format!("```\n{table}```")
}

pub fn teams_prompt_manual() -> String {
    "Very good, sir. Please provide the names of the participants, separated by commas, if you would be so kind."
        .to_owned()
}

pub fn teams_need_more_players() -> String {
    "I'm afraid I need at least two participants to create balanced teams, sir.".to_owned()
}

pub fn apology() -> String {
    "I do apologize, sir. I encountered an error while handling that request.".to_owned()
}
