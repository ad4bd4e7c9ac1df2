mod tests_buffers;
mod tests_builder;
mod tests_cancellation;
mod tests_packages;
mod tests_symlinks;
