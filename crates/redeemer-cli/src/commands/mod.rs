pub(crate) mod redeem;
