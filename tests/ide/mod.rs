mod tests_analysis;
mod tests_completion;
