mod fake;
mod launch;
