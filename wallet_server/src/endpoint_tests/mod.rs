mod helpers;
mod orders;
mod otp;
mod payments;
mod wallet;
mod webhooks;
