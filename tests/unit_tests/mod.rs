mod element;
mod rheology;
