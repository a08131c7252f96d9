pub mod stream_fixture;
