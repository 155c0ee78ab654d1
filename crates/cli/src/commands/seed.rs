//! Seed the standard rooms.

use tracing::info;

/// Rooms every fresh install starts with: name, description, shower, minibar.
const ROOMS: &[(&str, &str, bool, bool)] = &[
    (
        "General's Quarters",
        "A spacious corner room with a four-poster bed and a view over the lake.",
        true,
        true,
    ),
    (
        "Major's Suite",
        "A quiet suite under the eaves with a reading nook and a garden view.",
        true,
        false,
    ),
];

/// Insert any standard room that does not exist yet.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn rooms() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let mut inserted = 0;
    let mut skipped = 0;
    for &(name, description, shower, minibar) in ROOMS {
        let result = sqlx::query(
            r"
            INSERT INTO rooms (room_name, description, shower, minibar)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (room_name) DO NOTHING
            ",
        )
        .bind(name)
        .bind(description)
        .bind(shower)
        .bind(minibar)
        .execute(&pool)
        .await?;
        if result.rows_affected() == 0 {
            skipped += 1;
        } else {
            inserted += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Rooms inserted: {inserted}");
    info!("  Rooms skipped (already exist): {skipped}");
    Ok(())
}
