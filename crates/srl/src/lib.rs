/* Copyright (C) 2024  AlphaKeks <alphakeks@dawn.sh>
 *
 * This library is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This library is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this repository.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Points & placement recomputation for speedrun leaderboards.
//!
//! Every approved run belongs to exactly one leaderboard (see [`LeaderboardKey`]). Whenever a run
//! is created, edited, approved, or deleted, its leaderboard has to be re-ranked and every run on
//! it re-scored. [`recompute::Recomputer`] owns that process; the pure pieces it is built from
//! live in [`timing`], [`ranking`], [`points`], and [`leaderboards`].
//!
//! [`LeaderboardKey`]: runs::LeaderboardKey

#[macro_use]
extern crate derive_more;

#[allow(unused_imports)]
#[macro_use(trace, debug, info, warn, error)]
extern crate tracing;

#[macro_use(select)]
extern crate tokio;

#[macro_use]
mod macros;

pub mod config;
pub use config::Config;

pub mod context;
pub use context::Context;

pub mod database;
pub mod events;
pub mod time;

pub mod runs;
pub mod timing;
pub mod ranking;
pub mod points;
pub mod leaderboards;
pub mod recompute;
