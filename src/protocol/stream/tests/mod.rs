mod codec_proptest;
mod rtcp;
