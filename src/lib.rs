pub mod batch;
pub mod clock;
pub mod converter;
mod duckdb_impl;
pub mod error;
pub mod features;
pub mod headers;
pub mod inference;
mod log;
mod reader;
pub mod spent;
pub mod timecontrol;
pub mod types;
pub mod visitor;

use clock::ChessClockSecondsScalar;
use converter::ChessTimeFeaturesScalar;
use duckdb::{Connection, Result};
use duckdb_ext_macros::duckdb_extension;
use reader::ReadPgnFeaturesVTab;
use std::error::Error;

#[duckdb_extension(name = "chess_elo_features", api_version = "v1.0.0")]
pub unsafe fn extension_entrypoint(con: Connection) -> Result<(), Box<dyn Error>> {
    log::init();

    // Table functions
    con.register_table_function::<ReadPgnFeaturesVTab>("read_pgn_features")?;

    // Scalar functions
    con.register_scalar_function::<ChessClockSecondsScalar>("chess_clock_seconds")?;
    con.register_scalar_function::<ChessTimeFeaturesScalar>("chess_time_features")?;

    Ok(())
}
