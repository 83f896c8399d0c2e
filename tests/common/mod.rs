pub mod games_server;
