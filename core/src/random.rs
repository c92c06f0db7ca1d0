/*
 * random.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Wirehttp, a byte-exact HTTP client engine.
 *
 * Wirehttp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Wirehttp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Wirehttp.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Random string source for multipart boundaries. Injectable so tests can fix the output.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Source of random alphanumeric strings.
pub trait RandomStringProvider: Send + Sync {
    /// Return `n` random characters from `[A-Za-z0-9]`.
    fn alnum(&self, n: usize) -> String;
}

/// Default provider backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngProvider;

impl RandomStringProvider for ThreadRngProvider {
    fn alnum(&self, n: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(n)
            .map(char::from)
            .collect()
    }
}

/// Provider that always returns the same token, whatever length is asked for.
#[derive(Debug, Clone)]
pub struct FixedProvider(pub String);

impl RandomStringProvider for FixedProvider {
    fn alnum(&self, _n: usize) -> String {
        self.0.clone()
    }
}
