//! Main entry point for CLI command to start the relay.

fn main() -> anyhow::Result<()> {
    graphql_relay::main()
}
